// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-frame loop: pull the frame, route this frame's tap, draw what tracks.
//!
//! Never waits on network completions; anything they changed shows up in the
//! next snapshot.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::coordinator::CloudAnchorCoordinator;
use crate::error::{HostRejected, SessionError};
use crate::events::SessionEvent;
use crate::hit::{select_host_hit, select_resolve_match, MatchRadius, TrackedAnchor};
use crate::ids::{CloudAnchorId, RequestToken};
use crate::model::Mode;
use crate::ports::{AnchorRenderer, AnchorVisual, Tap, TrackingFrame, TrackingSession, TrackingState};

/// What happened to this frame's tap.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TapOutcome {
    /// No tap was waiting.
    #[default]
    NoTap,
    /// A tap was consumed but the camera was not tracking.
    NotTracking,
    /// Nothing qualified; silent.
    NoQualifyingHit,
    /// A host request was started for the hit.
    HostStarted(RequestToken),
    /// The hit qualified but hosting was refused.
    HostRejected(HostRejected),
    /// A resolved anchor matched; its description was sent to the UI.
    Matched(CloudAnchorId),
}

/// Summary of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Camera tracking state for the frame.
    pub camera: TrackingState,
    /// Tap handling result.
    pub tap: TapOutcome,
    /// Anchors drawn.
    pub anchors_drawn: usize,
    /// Anchors skipped because they were not tracking.
    pub anchors_skipped: usize,
    /// Whether tracked planes were drawn.
    pub planes_drawn: bool,
}

/// Frame loop bound to one coordinator.
pub struct FrameSync<T: TrackingSession> {
    coordinator: Arc<CloudAnchorCoordinator<T>>,
    radius: MatchRadius,
}

impl<T: TrackingSession> FrameSync<T> {
    pub(crate) fn new(coordinator: Arc<CloudAnchorCoordinator<T>>, radius: MatchRadius) -> Self {
        Self {
            coordinator,
            radius,
        }
    }

    /// Run one frame.
    pub fn run_frame<R: AnchorRenderer + ?Sized>(
        &self,
        renderer: &mut R,
    ) -> Result<FrameReport, SessionError> {
        let coordinator = &self.coordinator;
        let frame = coordinator.tracking().update()?;
        let camera = frame.camera_tracking_state();

        let tap = match coordinator.taps().consume_tap() {
            None => TapOutcome::NoTap,
            Some(_) if camera != TrackingState::Tracking => {
                debug!(?camera, "tap dropped while camera not tracking");
                TapOutcome::NotTracking
            }
            Some(tap) => self.route_tap(&frame, &tap)?,
        };

        let mut report = FrameReport {
            camera,
            tap,
            anchors_drawn: 0,
            anchors_skipped: 0,
            planes_drawn: false,
        };
        if camera == TrackingState::Paused {
            trace!("camera paused; nothing drawn");
            return Ok(report);
        }

        let snapshot = coordinator.store().snapshot_for_render();
        if !snapshot.host_active {
            renderer.draw_planes(&frame.planes());
            report.planes_drawn = true;
        }
        let handles = snapshot
            .resolved
            .iter()
            .map(|r| (r.handle, AnchorVisual::Resolved))
            .chain(snapshot.hosted.iter().map(|r| (r.handle, AnchorVisual::Hosted)));
        for (handle, visual) in handles {
            match frame.anchor_sample(handle) {
                Some(sample) if sample.tracking == TrackingState::Tracking => {
                    renderer.draw_anchor(&sample.pose.to_mat4(), visual);
                    report.anchors_drawn += 1;
                }
                _ => report.anchors_skipped += 1,
            }
        }
        Ok(report)
    }

    fn route_tap(&self, frame: &T::Frame, tap: &Tap) -> Result<TapOutcome, SessionError> {
        let coordinator = &self.coordinator;
        let hits = frame.hit_test(tap);
        match coordinator.mode() {
            Mode::Hosting => {
                let Some(hit) = select_host_hit(&hits) else {
                    return Ok(TapOutcome::NoQualifyingHit);
                };
                let handle = coordinator.tracking().create_anchor(hit)?;
                match coordinator.host_anchor(handle) {
                    Ok(token) => Ok(TapOutcome::HostStarted(token)),
                    Err(rejected) => {
                        debug!(%rejected, %handle, "host refused; detaching new anchor");
                        coordinator.tracking().detach_anchor(handle);
                        Ok(TapOutcome::HostRejected(rejected))
                    }
                }
            }
            Mode::Resolving => {
                let tracked: Vec<TrackedAnchor> = coordinator
                    .store()
                    .resolved()
                    .into_iter()
                    .filter_map(|record| {
                        let sample = frame.anchor_sample(record.handle)?;
                        Some(TrackedAnchor { record, sample })
                    })
                    .collect();
                let Some(found) = select_resolve_match(&hits, &tracked, self.radius) else {
                    return Ok(TapOutcome::NoQualifyingHit);
                };
                let cloud_anchor_id = found.record.cloud_anchor_id.clone();
                coordinator.emit(SessionEvent::ShowDescription {
                    cloud_anchor_id: cloud_anchor_id.clone(),
                    description: found.record.description.clone(),
                });
                Ok(TapOutcome::Matched(cloud_anchor_id))
            }
        }
    }
}
