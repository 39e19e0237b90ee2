// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session events for the UI layer, plus a channel-backed port to drain them.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::{Duration, Instant};

use anchor_app_core::status::{StatusBoard, StatusKind};
use tracing::debug;

use crate::capture::DescriptionCapture;
use crate::error::CloudAnchorError;
use crate::ids::{CloudAnchorId, RequestToken};
use crate::model::AnchorPhase;

/// How long a status line derived from an event stays up.
pub const STATUS_TTL: Duration = Duration::from_secs(4);

/// Notifications raised by the coordinator and the frame loop.
#[derive(Debug)]
pub enum SessionEvent {
    /// Host submitted; input is blocked until it completes.
    HostStarted {
        /// Request token.
        token: RequestToken,
    },
    /// Host succeeded.
    Hosted {
        /// Request token.
        token: RequestToken,
        /// Id issued by the service.
        cloud_anchor_id: CloudAnchorId,
    },
    /// Prompt the user for a description of the freshly hosted anchor.
    DescribeAnchor(DescriptionCapture),
    /// Host failed (terminal).
    HostFailed {
        /// Request token.
        token: RequestToken,
        /// Service error.
        error: CloudAnchorError,
    },
    /// Resolve submitted.
    ResolveStarted {
        /// Request token.
        token: RequestToken,
        /// Anchor being resolved.
        cloud_anchor_id: CloudAnchorId,
    },
    /// Resolve succeeded; `remaining` still pending.
    Resolved {
        /// Anchor resolved.
        cloud_anchor_id: CloudAnchorId,
        /// Descriptors still unresolved.
        remaining: usize,
    },
    /// Resolve failed (terminal).
    ResolveFailed {
        /// Anchor that failed.
        cloud_anchor_id: CloudAnchorId,
        /// Service error.
        error: CloudAnchorError,
    },
    /// Every seeded descriptor is resolved. Raised once per session.
    AllResolved,
    /// A tap matched a resolved anchor; show its description.
    ShowDescription {
        /// Matched anchor.
        cloud_anchor_id: CloudAnchorId,
        /// Description to display.
        description: String,
    },
    /// A frame was abandoned; later frames continue.
    FrameError {
        /// Rendered error.
        detail: String,
    },
}

impl SessionEvent {
    /// Lifecycle phase this event reports, if any.
    pub fn phase(&self) -> Option<AnchorPhase> {
        match self {
            Self::HostStarted { .. } => Some(AnchorPhase::HostRequested),
            Self::Hosted {
                cloud_anchor_id, ..
            } => Some(AnchorPhase::Hosted(cloud_anchor_id.clone())),
            Self::HostFailed { error, .. } => Some(AnchorPhase::HostFailed(error.clone())),
            Self::ResolveStarted {
                cloud_anchor_id, ..
            } => Some(AnchorPhase::ResolveRequested(cloud_anchor_id.clone())),
            Self::Resolved {
                cloud_anchor_id, ..
            } => Some(AnchorPhase::Resolved(cloud_anchor_id.clone())),
            Self::ResolveFailed {
                cloud_anchor_id,
                error,
            } => Some(AnchorPhase::ResolveFailed(
                cloud_anchor_id.clone(),
                error.clone(),
            )),
            Self::DescribeAnchor(_)
            | Self::AllResolved
            | Self::ShowDescription { .. }
            | Self::FrameError { .. } => None,
        }
    }

    /// Status line for this event: kind, title and optional body.
    pub fn status(&self) -> Option<(StatusKind, String, Option<String>)> {
        let line = match self {
            Self::HostStarted { .. } => (StatusKind::Processing, "Hosting anchor...".into(), None),
            Self::Hosted {
                cloud_anchor_id, ..
            } => (
                StatusKind::Success,
                "Anchor hosted".into(),
                Some(cloud_anchor_id.to_string()),
            ),
            Self::HostFailed { error, .. } => (
                StatusKind::Error,
                "Hosting failed".into(),
                Some(error.to_string()),
            ),
            Self::ResolveStarted { .. } => {
                (StatusKind::Processing, "Resolving anchors...".into(), None)
            }
            Self::Resolved { remaining, .. } => (
                StatusKind::Success,
                "Anchor resolved".into(),
                Some(format!("{remaining} remaining")),
            ),
            Self::ResolveFailed {
                cloud_anchor_id,
                error,
            } => (
                StatusKind::Error,
                "Resolve failed".into(),
                Some(format!("{cloud_anchor_id}: {error}")),
            ),
            Self::AllResolved => (
                StatusKind::Done,
                "All pending anchors resolved".into(),
                None,
            ),
            Self::FrameError { detail } => {
                (StatusKind::Error, "Frame error".into(), Some(detail.clone()))
            }
            Self::DescribeAnchor(_) | Self::ShowDescription { .. } => return None,
        };
        Some(line)
    }

    /// Post this event's status line (if any) to `board`.
    pub fn post_to(&self, board: &mut StatusBoard, now: Instant) {
        if let Some((kind, title, body)) = self.status() {
            board.post(kind, title, body, STATUS_TTL, now);
        }
    }
}

/// Sending half held by the coordinator.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: Sender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: Sender<SessionEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}

/// Abstract port for receiving session events.
pub trait EventPort {
    /// Drain up to `max` pending events without blocking.
    fn drain_events(&mut self, max: usize) -> Vec<SessionEvent>;
}

/// Channel-backed [`EventPort`].
#[derive(Debug)]
pub struct ChannelEvents {
    rx: Receiver<SessionEvent>,
    disconnected: bool,
}

impl ChannelEvents {
    pub(crate) fn new(rx: Receiver<SessionEvent>) -> Self {
        Self {
            rx,
            disconnected: false,
        }
    }

    /// `true` once every sender is gone and the queue is empty.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl EventPort for ChannelEvents {
    fn drain_events(&mut self, max: usize) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        for _ in 0..max {
            match self.rx.try_recv() {
                Ok(event) => out.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_resolved_posts_done_line() {
        let mut board = StatusBoard::new(4);
        let now = Instant::now();
        SessionEvent::AllResolved.post_to(&mut board, now);
        let line = board.latest();
        assert_eq!(line.map(|l| l.kind), Some(StatusKind::Done));
    }

    #[test]
    fn drain_stops_at_empty() {
        let (tx, rx) = std::sync::mpsc::channel();
        let sink = EventSink::new(tx);
        sink.emit(SessionEvent::AllResolved);
        let mut events = ChannelEvents::new(rx);
        assert_eq!(events.drain_events(8).len(), 1);
        assert!(events.drain_events(8).is_empty());
        assert!(!events.is_disconnected());
    }
}
