// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session lifecycle: construction from explicit config, tap/frame entry
//! points for the UI host, and teardown.

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Weak};

use anchor_app_core::prefs::SessionPrefs;
use tracing::{debug, info, instrument, warn};

use crate::coordinator::CloudAnchorCoordinator;
use crate::directory::AnchorDirectory;
use crate::error::SessionError;
use crate::events::{ChannelEvents, EventSink, SessionEvent};
use crate::frame::{FrameReport, FrameSync};
use crate::hit::MatchRadius;
use crate::model::{Mode, UnresolvedAnchorDescriptor};
use crate::ports::{AnchorRenderer, Tap, TrackingSession};
use crate::store::AnchorStore;
use crate::tap::TapDisposition;

/// Everything a session needs decided up front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Hosting or resolving; fixed for the session.
    pub mode: Mode,
    /// Image-sharing consent. Required to start.
    pub allow_share_images: bool,
    /// Tap-to-anchor match radius.
    pub match_radius: MatchRadius,
    /// Max outstanding resolve requests; `None` issues all at once.
    pub max_concurrent_resolves: Option<NonZeroUsize>,
}

impl SessionConfig {
    /// Defaults for `mode`, without consent.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            allow_share_images: false,
            match_radius: MatchRadius::default(),
            max_concurrent_resolves: None,
        }
    }

    /// Build from persisted preferences.
    pub fn from_prefs(mode: Mode, prefs: &SessionPrefs) -> Result<Self, SessionError> {
        let max_concurrent_resolves = match prefs.max_concurrent_resolves {
            None => None,
            Some(n) => Some(NonZeroUsize::new(n).ok_or_else(|| {
                SessionError::InvalidConfig("resolve cap must be at least 1".into())
            })?),
        };
        Ok(Self {
            mode,
            allow_share_images: prefs.allow_share_images,
            match_radius: MatchRadius::new(prefs.match_radius_m)?,
            max_concurrent_resolves,
        })
    }

    /// Record consent.
    #[must_use]
    pub fn with_consent(mut self) -> Self {
        self.allow_share_images = true;
        self
    }

    /// Override the match radius.
    #[must_use]
    pub fn with_match_radius(mut self, radius: MatchRadius) -> Self {
        self.match_radius = radius;
        self
    }

    /// Cap resolve fan-out.
    #[must_use]
    pub fn with_resolve_cap(mut self, cap: NonZeroUsize) -> Self {
        self.max_concurrent_resolves = Some(cap);
        self
    }
}

/// A running AR session.
///
/// Dropping the session shuts it down.
pub struct Session<T: TrackingSession> {
    config: SessionConfig,
    coordinator: Arc<CloudAnchorCoordinator<T>>,
    frames: FrameSync<T>,
    directory: Arc<dyn AnchorDirectory>,
}

impl<T: TrackingSession> Session<T> {
    /// Start a session.
    ///
    /// In resolving mode every descriptor is seeded and resolve requests are
    /// issued (subject to the cap). Descriptors are ignored when hosting.
    #[instrument(skip_all, fields(mode = ?config.mode))]
    pub fn start(
        config: SessionConfig,
        tracking: Arc<T>,
        directory: Arc<dyn AnchorDirectory>,
        descriptors: Vec<UnresolvedAnchorDescriptor>,
    ) -> Result<(Self, ChannelEvents), SessionError> {
        if !config.allow_share_images {
            warn!("session refused: image-sharing consent missing");
            return Err(SessionError::ConsentRequired);
        }
        let (tx, rx) = mpsc::channel();
        let coordinator = CloudAnchorCoordinator::new(
            config.mode,
            tracking,
            Arc::clone(&directory),
            EventSink::new(tx),
            config.max_concurrent_resolves,
        );
        let session = Self {
            config,
            frames: FrameSync::new(Arc::clone(&coordinator), config.match_radius),
            coordinator,
            directory,
        };
        info!("session started");
        match config.mode {
            Mode::Resolving => {
                session.coordinator.resolve_all(descriptors);
            }
            Mode::Hosting if !descriptors.is_empty() => {
                debug!(count = descriptors.len(), "descriptors ignored in hosting mode");
            }
            Mode::Hosting => {}
        }
        Ok((session, ChannelEvents::new(rx)))
    }

    /// Resolving mode: list the shared directory and resolve everything in
    /// it. The listing callback may fire later; it is dropped if the session
    /// is gone by then.
    pub fn seed_from_directory(&self) {
        if self.config.mode != Mode::Resolving {
            debug!("directory seeding skipped in hosting mode");
            return;
        }
        let weak: Weak<CloudAnchorCoordinator<T>> = Arc::downgrade(&self.coordinator);
        self.directory.fetch_all(Box::new(move |descriptors| {
            if let Some(coordinator) = weak.upgrade() {
                let added = coordinator.resolve_all(descriptors);
                debug!(added, "seeded from directory");
            }
        }));
    }

    /// Input timeline entry point. Always handled; see [`TapDisposition`].
    pub fn on_tap(&self, tap: Tap) -> TapDisposition {
        if !self.is_active() {
            return TapDisposition::Ignored;
        }
        self.coordinator.taps().on_tap(tap)
    }

    /// Run one frame. Errors and panics inside the frame are logged, raised
    /// as [`SessionEvent::FrameError`] and swallowed so the next frame runs.
    pub fn on_frame<R: AnchorRenderer + ?Sized>(&self, renderer: &mut R) -> Option<FrameReport> {
        if !self.is_active() {
            return None;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.frames.run_frame(renderer)));
        let err = match outcome {
            Ok(Ok(report)) => return Some(report),
            Ok(Err(err)) => err,
            Err(payload) => SessionError::FramePanicked(panic_detail(payload.as_ref())),
        };
        warn!(%err, "frame abandoned");
        self.coordinator.emit(SessionEvent::FrameError {
            detail: err.to_string(),
        });
        None
    }

    /// Run one frame, surfacing errors instead of swallowing them.
    pub fn try_frame<R: AnchorRenderer + ?Sized>(
        &self,
        renderer: &mut R,
    ) -> Result<FrameReport, SessionError> {
        self.frames.run_frame(renderer)
    }

    /// Release the active-host marker so a new hit may be hosted.
    pub fn clear_active_host(&self) {
        self.coordinator.clear_active_host();
    }

    /// Tear down: later completions are stale and the tracking subsystem is
    /// closed. Idempotent.
    pub fn shutdown(&self) {
        if self.coordinator.deactivate() {
            self.coordinator.taps().clear();
            self.coordinator.tracking().close();
            info!("session shut down");
        }
    }

    /// `false` after [`Self::shutdown`].
    pub fn is_active(&self) -> bool {
        self.coordinator.is_active()
    }

    /// Session mode.
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Config the session was started with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Anchor state.
    pub fn store(&self) -> &AnchorStore {
        self.coordinator.store()
    }

    /// `true` if a tap is waiting for the next frame.
    pub fn has_pending_tap(&self) -> bool {
        self.coordinator.taps().has_pending()
    }

    /// Resolve requests awaiting completion.
    pub fn resolves_in_flight(&self) -> usize {
        self.coordinator.resolves_in_flight()
    }
}

impl<T: TrackingSession> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl<T: TrackingSession> Drop for Session<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_resolve_cap_is_rejected() {
        let prefs = SessionPrefs {
            max_concurrent_resolves: Some(0),
            ..SessionPrefs::default()
        };
        assert!(matches!(
            SessionConfig::from_prefs(Mode::Resolving, &prefs),
            Err(SessionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn prefs_carry_consent_and_radius() {
        let prefs = SessionPrefs {
            match_radius_m: 0.5,
            ..SessionPrefs::default().with_consent()
        };
        let config = SessionConfig::from_prefs(Mode::Hosting, &prefs);
        assert!(config.as_ref().is_ok_and(|c| c.allow_share_images));
        assert!(config.is_ok_and(|c| c.match_radius.admits(0.49) && !c.match_radius.admits(0.5)));
    }
}
