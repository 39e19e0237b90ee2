// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types for the anchor lifecycle.

use thiserror::Error;

use crate::ids::RequestToken;

/// Terminal failure reported by the cloud-anchor service for a host or resolve
/// request. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloudAnchorError {
    /// Credentials rejected by the service.
    #[error("not authorized")]
    NotAuthorized,
    /// Service unreachable.
    #[error("service unavailable")]
    ServiceUnavailable,
    /// Quota or rate limit hit.
    #[error("resource exhausted")]
    ResourceExhausted,
    /// Not enough visual data around the anchor to host it.
    #[error("hosting dataset processing failed")]
    DatasetProcessingFailed,
    /// No anchor with that id exists (or it expired).
    #[error("cloud anchor not found")]
    NotFound,
    /// The anchor was hosted with an SDK too old to resolve.
    #[error("anchor too old to resolve")]
    TooOld,
    /// Anything else the tracking subsystem reports.
    #[error("internal: {0}")]
    Internal(String),
}

/// Failure inside the local tracking subsystem (not the cloud service).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackingError {
    /// The tracking session is paused or not yet running.
    #[error("tracking session not running")]
    NotRunning,
    /// The session was closed.
    #[error("tracking session closed")]
    Closed,
    /// The camera is unavailable to the tracking subsystem.
    #[error("camera unavailable")]
    CameraUnavailable,
    /// Anchor creation failed for the given hit.
    #[error("could not create anchor: {0}")]
    AnchorCreation(String),
}

/// Failure talking to the shared anchor directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The directory is offline or the write was rejected.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    /// The record could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Failure completing the description-capture flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Blank descriptions are not published; the capture stays open.
    #[error("description must not be empty")]
    EmptyDescription,
    /// This capture already published a description.
    #[error("description already submitted")]
    AlreadySubmitted,
    /// The directory write failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Why a host request was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostRejected {
    /// Another host request is still in flight.
    #[error("host request {0} still in flight")]
    Busy(RequestToken),
    /// The session is hosting-disabled (resolving mode).
    #[error("hosting not permitted in resolving mode")]
    WrongMode,
    /// The session has been shut down.
    #[error("session inactive")]
    Inactive,
}

/// Errors surfaced by session construction and per-frame work.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The user has not accepted the image-sharing notice.
    #[error("image-sharing consent required before starting a session")]
    ConsentRequired,
    /// A configuration value is out of range.
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
    /// The tracking subsystem failed.
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    /// A per-frame operation panicked; the frame was abandoned.
    #[error("frame aborted: {0}")]
    FramePanicked(String),
}
