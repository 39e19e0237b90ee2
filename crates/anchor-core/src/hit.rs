// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hit disambiguation: turns ordered hit-test results into a host target or a
//! resolved-anchor match.
//!
//! Both selectors are first-match over the order the tracking subsystem
//! supplies (nearest / most confident first).

use anchor_app_core::prefs::DEFAULT_MATCH_RADIUS_M;
use tracing::trace;

use crate::error::SessionError;
use crate::model::ResolvedAnchorRecord;
use crate::ports::{AnchorSample, HitCandidate, TrackingState};

/// Exclusive distance (metres) within which a hit selects a resolved anchor.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MatchRadius(f32);

impl MatchRadius {
    /// Validated radius; must be finite and positive.
    pub fn new(metres: f32) -> Result<Self, SessionError> {
        if metres.is_finite() && metres > 0.0 {
            Ok(Self(metres))
        } else {
            Err(SessionError::InvalidConfig(format!(
                "match radius must be a positive distance, got {metres}"
            )))
        }
    }

    /// Radius in metres.
    pub const fn metres(self) -> f32 {
        self.0
    }

    /// Strict `<` comparison.
    pub fn admits(self, distance: f32) -> bool {
        distance < self.0
    }
}

impl Default for MatchRadius {
    fn default() -> Self {
        Self(DEFAULT_MATCH_RADIUS_M)
    }
}

/// A resolved anchor paired with this frame's tracking sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedAnchor {
    /// Store record.
    pub record: ResolvedAnchorRecord,
    /// Sample taken from the current frame.
    pub sample: AnchorSample,
}

impl TrackedAnchor {
    /// `true` while the anchor is actively tracking.
    pub fn is_tracking(&self) -> bool {
        self.sample.tracking == TrackingState::Tracking
    }
}

/// First candidate that is a plane hit landing inside the plane's polygon.
///
/// Candidates after the first qualifying one are not inspected.
pub fn select_host_hit(candidates: &[HitCandidate]) -> Option<&HitCandidate> {
    candidates.iter().find(|c| c.lands_inside_plane())
}

/// For the first candidate that matches anything, the first actively tracking
/// resolved anchor strictly within `radius` of the hit position.
///
/// Orientation is ignored.
pub fn select_resolve_match<'a>(
    candidates: &[HitCandidate],
    anchors: &'a [TrackedAnchor],
    radius: MatchRadius,
) -> Option<&'a TrackedAnchor> {
    candidates.iter().find_map(|candidate| {
        anchors.iter().find(|anchor| {
            if !anchor.is_tracking() {
                return false;
            }
            let distance = anchor.sample.pose.distance_to(&candidate.hit_pose);
            trace!(
                cloud_anchor_id = %anchor.record.cloud_anchor_id,
                distance,
                "resolve match candidate"
            );
            radius.admits(distance)
        })
    })
}
