// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Port traits for the collaborators the coordinator drives: the AR tracking
//! subsystem (frames, hit tests, host/resolve primitives) and the renderer.
//!
//! Implementations live in platform shells; the core never touches a camera,
//! a GPU or a socket directly.

use anchor_geom::math::Mat4;
use anchor_geom::{PlanePolygon, Pose};

use crate::coordinator::{HostCompleter, ResolveCompleter};
use crate::error::TrackingError;
use crate::ids::{AnchorHandle, CloudAnchorId};

/// Whether the tracking subsystem has a valid real-time pose estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// Pose is current.
    Tracking,
    /// Temporarily lost; may resume.
    Paused,
    /// Will never resume.
    Stopped,
}

/// Screen-space tap in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

impl Tap {
    /// Tap at `(x, y)`.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// What a hit-test ray intersected.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// A detected plane with its measured boundary.
    Plane(PlanePolygon),
    /// A feature point from the point cloud.
    Point,
    /// A depth-map sample.
    Depth,
}

/// One hit-test result, in the order the tracking subsystem reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct HitCandidate {
    /// Trackable that was hit.
    pub surface: Surface,
    /// Pose of the intersection point.
    pub hit_pose: Pose,
}

impl HitCandidate {
    /// Hit on a plane.
    pub fn on_plane(plane: PlanePolygon, hit_pose: Pose) -> Self {
        Self {
            surface: Surface::Plane(plane),
            hit_pose,
        }
    }

    /// Hit on a feature point.
    pub fn on_point(hit_pose: Pose) -> Self {
        Self {
            surface: Surface::Point,
            hit_pose,
        }
    }

    /// `true` if the hit is on a plane and inside that plane's polygon.
    pub fn lands_inside_plane(&self) -> bool {
        match &self.surface {
            Surface::Plane(polygon) => polygon.contains_pose(&self.hit_pose),
            Surface::Point | Surface::Depth => false,
        }
    }
}

/// Per-frame sample of an anchor's tracking state and pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorSample {
    /// Current tracking state.
    pub tracking: TrackingState,
    /// Latest world pose estimate.
    pub pose: Pose,
}

/// One camera frame obtained from [`TrackingSession::update`].
pub trait TrackingFrame {
    /// Camera tracking state for this frame.
    fn camera_tracking_state(&self) -> TrackingState;
    /// Hit-test a screen tap; results are ordered nearest/most-confident first.
    fn hit_test(&self, tap: &Tap) -> Vec<HitCandidate>;
    /// Sample an anchor; `None` if the handle is unknown or detached.
    fn anchor_sample(&self, handle: AnchorHandle) -> Option<AnchorSample>;
    /// Planes currently tracked (for visualisation only).
    fn planes(&self) -> Vec<PlanePolygon> {
        Vec::new()
    }
}

/// The AR tracking subsystem with asynchronous cloud host/resolve primitives.
///
/// `host_anchor` and `resolve_anchor` must return immediately; the completer
/// is invoked later (possibly synchronously, possibly on another thread).
/// Callers never hold internal locks across these calls.
pub trait TrackingSession: Send + Sync + 'static {
    /// Frame type produced by [`Self::update`].
    type Frame: TrackingFrame;

    /// Pull the latest frame; may block up to one frame interval.
    fn update(&self) -> Result<Self::Frame, TrackingError>;
    /// Create a local anchor at a hit.
    fn create_anchor(&self, hit: &HitCandidate) -> Result<AnchorHandle, TrackingError>;
    /// Release a local anchor.
    fn detach_anchor(&self, handle: AnchorHandle);
    /// Start hosting a local anchor.
    fn host_anchor(&self, handle: AnchorHandle, completer: HostCompleter);
    /// Start resolving a hosted anchor.
    fn resolve_anchor(&self, cloud_anchor_id: &CloudAnchorId, completer: ResolveCompleter);
    /// Close the session; in-flight requests may still complete afterwards.
    fn close(&self);
}

/// Which list an anchor being drawn comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorVisual {
    /// Placed locally in this session (hosting or hosted).
    Hosted,
    /// Resolved from the shared directory.
    Resolved,
}

/// Render-facing port; the core hands over model matrices, nothing more.
pub trait AnchorRenderer {
    /// Draw one anchor model at `model`.
    fn draw_anchor(&mut self, model: &Mat4, visual: AnchorVisual);
    /// Draw tracked planes (only while no host request is in flight).
    fn draw_planes(&mut self, planes: &[PlanePolygon]);
}
