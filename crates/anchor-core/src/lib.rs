// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! anchor-core: the cloud anchor lifecycle coordinator.
//!
//! Two timelines meet here. The frame loop ([`FrameSync`], driven through
//! [`Session::on_frame`]) pulls camera frames, consumes at most one tap per
//! frame and draws whatever is tracking. Host and resolve completions arrive
//! on whatever thread the tracking subsystem uses and fold into the
//! [`AnchorStore`] under its lock. Neither timeline waits on the other.
//!
//! Platform shells implement [`TrackingSession`], [`AnchorDirectory`] and
//! [`AnchorRenderer`]; the UI drains [`SessionEvent`]s from the channel
//! returned by [`Session::start`].

pub mod capture;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod events;
pub mod frame;
pub mod hit;
pub mod ids;
pub mod model;
pub mod ports;
pub mod session;
pub mod store;
pub mod tap;

pub use capture::DescriptionCapture;
pub use coordinator::{CloudAnchorCoordinator, HostCompleter, ResolveCompleter};
pub use directory::{AnchorDirectory, DirectoryRecord, MemoryDirectory};
pub use error::{
    CaptureError, CloudAnchorError, DirectoryError, HostRejected, SessionError, TrackingError,
};
pub use events::{ChannelEvents, EventPort, SessionEvent};
pub use frame::{FrameReport, FrameSync, TapOutcome};
pub use hit::{select_host_hit, select_resolve_match, MatchRadius, TrackedAnchor};
pub use ids::{AnchorHandle, CloudAnchorId, RequestToken};
pub use model::{
    AnchorPhase, AnchorRecord, HostPhase, Mode, ResolvedAnchorRecord, UnresolvedAnchorDescriptor,
};
pub use ports::{
    AnchorRenderer, AnchorSample, AnchorVisual, HitCandidate, Surface, Tap, TrackingFrame,
    TrackingSession, TrackingState,
};
pub use session::{Session, SessionConfig};
pub use store::{AnchorStore, HostFinish, HostSlot, Promotion, RenderSnapshot};
pub use tap::{TapDisposition, TapRouter, TapSlot};
