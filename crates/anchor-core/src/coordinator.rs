// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cloud anchor coordinator: issues host/resolve requests and folds their
//! completions back into the [`AnchorStore`].
//!
//! Each request carries a [`RequestToken`] minted before submission. The
//! tracking subsystem receives a move-only completer; calling
//! [`HostCompleter::complete`] or [`ResolveCompleter::complete`] consumes it,
//! so a request completes at most once. Completers hold only a weak reference
//! to the coordinator: once the session is gone, completions are stale and
//! dropped.
//!
//! No internal lock is held while calling the tracking subsystem; completions
//! may arrive synchronously from inside `host_anchor` / `resolve_anchor`.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, instrument, warn};

use crate::capture::DescriptionCapture;
use crate::directory::AnchorDirectory;
use crate::error::{CloudAnchorError, HostRejected};
use crate::events::{EventSink, SessionEvent};
use crate::ids::{AnchorHandle, CloudAnchorId, RequestToken, TokenSource};
use crate::model::{Mode, UnresolvedAnchorDescriptor};
use crate::ports::TrackingSession;
use crate::store::{AnchorStore, HostFinish, Promotion};
use crate::tap::TapRouter;

/// Receiver side of a completer.
trait CompletionHandler: Send + Sync {
    fn host_completed(&self, token: RequestToken, outcome: Result<CloudAnchorId, CloudAnchorError>);
    fn resolve_completed(
        &self,
        token: RequestToken,
        cloud_anchor_id: CloudAnchorId,
        outcome: Result<AnchorHandle, CloudAnchorError>,
    );
}

/// One-shot completion for a host request.
pub struct HostCompleter {
    token: RequestToken,
    handler: Weak<dyn CompletionHandler>,
}

impl HostCompleter {
    /// Token of the request this completes.
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Deliver the outcome. Consumes the completer.
    pub fn complete(self, outcome: Result<CloudAnchorId, CloudAnchorError>) {
        match self.handler.upgrade() {
            Some(handler) => handler.host_completed(self.token, outcome),
            None => debug!(token = %self.token, "host completion after teardown dropped"),
        }
    }
}

impl std::fmt::Debug for HostCompleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCompleter")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// One-shot completion for a resolve request.
pub struct ResolveCompleter {
    token: RequestToken,
    cloud_anchor_id: CloudAnchorId,
    handler: Weak<dyn CompletionHandler>,
}

impl ResolveCompleter {
    /// Token of the request this completes.
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Anchor being resolved.
    pub fn cloud_anchor_id(&self) -> &CloudAnchorId {
        &self.cloud_anchor_id
    }

    /// Deliver the outcome. Consumes the completer.
    pub fn complete(self, outcome: Result<AnchorHandle, CloudAnchorError>) {
        match self.handler.upgrade() {
            Some(handler) => handler.resolve_completed(self.token, self.cloud_anchor_id, outcome),
            None => debug!(
                token = %self.token,
                cloud_anchor_id = %self.cloud_anchor_id,
                "resolve completion after teardown dropped"
            ),
        }
    }
}

impl std::fmt::Debug for ResolveCompleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveCompleter")
            .field("token", &self.token)
            .field("cloud_anchor_id", &self.cloud_anchor_id)
            .finish_non_exhaustive()
    }
}

/// Resolve fan-out bookkeeping: ids waiting for a slot and requests in flight.
#[derive(Debug, Default)]
struct ResolveBook {
    cap: Option<NonZeroUsize>,
    waiting: VecDeque<CloudAnchorId>,
    in_flight: HashMap<RequestToken, CloudAnchorId>,
}

impl ResolveBook {
    fn knows(&self, id: &CloudAnchorId) -> bool {
        self.waiting.contains(id) || self.in_flight.values().any(|v| v == id)
    }

    fn has_room(&self) -> bool {
        self.cap.is_none_or(|cap| self.in_flight.len() < cap.get())
    }

    /// Move as many waiting ids into flight as the cap allows.
    fn next_batch(&mut self, tokens: &TokenSource) -> Vec<(RequestToken, CloudAnchorId)> {
        let mut batch = Vec::new();
        while self.has_room() {
            let Some(id) = self.waiting.pop_front() else {
                break;
            };
            let token = tokens.next();
            self.in_flight.insert(token, id.clone());
            batch.push((token, id));
        }
        batch
    }
}

/// Coordinator shared between the frame loop and the completion timeline.
pub struct CloudAnchorCoordinator<T: TrackingSession> {
    mode: Mode,
    tracking: Arc<T>,
    directory: Arc<dyn AnchorDirectory>,
    store: AnchorStore,
    taps: TapRouter,
    events: EventSink,
    tokens: TokenSource,
    active: AtomicBool,
    resolves: Mutex<ResolveBook>,
    self_ref: Weak<Self>,
}

impl<T: TrackingSession> CloudAnchorCoordinator<T> {
    pub(crate) fn new(
        mode: Mode,
        tracking: Arc<T>,
        directory: Arc<dyn AnchorDirectory>,
        events: EventSink,
        resolve_cap: Option<NonZeroUsize>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            mode,
            tracking,
            directory,
            store: AnchorStore::new(),
            taps: TapRouter::new(),
            events,
            tokens: TokenSource::new(),
            active: AtomicBool::new(true),
            resolves: Mutex::new(ResolveBook {
                cap: resolve_cap,
                ..ResolveBook::default()
            }),
            self_ref: self_ref.clone(),
        })
    }

    /// Session mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Anchor state.
    pub fn store(&self) -> &AnchorStore {
        &self.store
    }

    /// Tap hand-off.
    pub fn taps(&self) -> &TapRouter {
        &self.taps
    }

    /// Tracking subsystem.
    pub fn tracking(&self) -> &T {
        &self.tracking
    }

    /// `false` once the session has been shut down.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Resolve requests currently awaiting completion.
    pub fn resolves_in_flight(&self) -> usize {
        self.book().in_flight.len()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.events.emit(event);
    }

    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    fn book(&self) -> MutexGuard<'_, ResolveBook> {
        self.resolves.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handler(&self) -> Weak<dyn CompletionHandler> {
        self.self_ref.clone()
    }

    /// Start hosting a freshly created local anchor.
    ///
    /// Claims the one-active-host slot, registers the anchor as requested and
    /// blocks tap input until the completion arrives.
    #[instrument(skip(self), level = "debug")]
    pub fn host_anchor(&self, handle: AnchorHandle) -> Result<RequestToken, HostRejected> {
        if !self.is_active() {
            return Err(HostRejected::Inactive);
        }
        if self.mode != Mode::Hosting {
            return Err(HostRejected::WrongMode);
        }
        let token = self.tokens.next();
        self.store.begin_host(token, handle)?;
        self.taps.set_input_blocked(true);
        self.emit(SessionEvent::HostStarted { token });
        info!(%token, %handle, "host requested");
        self.tracking.host_anchor(
            handle,
            HostCompleter {
                token,
                handler: self.handler(),
            },
        );
        Ok(token)
    }

    /// Release the active-host marker without waiting for its completion.
    /// The request's eventual completion still records its outcome but no
    /// longer touches tap input.
    pub fn clear_active_host(&self) {
        self.store.clear_active_host();
        self.reopen_input();
    }

    /// Drop any tap queued while the slot was held and accept taps again.
    fn reopen_input(&self) {
        self.taps.clear();
        self.taps.set_input_blocked(false);
    }

    /// Seed `descriptors` and issue resolve requests for them, subject to the
    /// configured fan-out cap. Returns how many new descriptors were seeded.
    #[instrument(skip_all, level = "debug")]
    pub fn resolve_all(
        &self,
        descriptors: impl IntoIterator<Item = UnresolvedAnchorDescriptor>,
    ) -> usize {
        if !self.is_active() {
            debug!("resolve_all on inactive session ignored");
            return 0;
        }
        let added = self.store.seed_unresolved(descriptors);
        {
            let mut book = self.book();
            for id in self.store.unresolved_ids() {
                if !book.knows(&id) {
                    book.waiting.push_back(id);
                }
            }
        }
        self.pump_resolves();
        added
    }

    /// Issue whatever the cap allows. Never holds the book lock across the
    /// tracking call.
    fn pump_resolves(&self) {
        let batch = self.book().next_batch(&self.tokens);
        for (token, cloud_anchor_id) in batch {
            self.emit(SessionEvent::ResolveStarted {
                token,
                cloud_anchor_id: cloud_anchor_id.clone(),
            });
            debug!(%token, %cloud_anchor_id, "resolve requested");
            let completer = ResolveCompleter {
                token,
                cloud_anchor_id: cloud_anchor_id.clone(),
                handler: self.handler(),
            };
            self.tracking.resolve_anchor(&cloud_anchor_id, completer);
        }
    }
}

impl<T: TrackingSession> CompletionHandler for CloudAnchorCoordinator<T> {
    fn host_completed(&self, token: RequestToken, outcome: Result<CloudAnchorId, CloudAnchorError>) {
        if !self.is_active() {
            debug!(%token, "stale host completion ignored");
            return;
        }
        match outcome {
            Ok(cloud_anchor_id) => match self.store.finish_host(token, Some(cloud_anchor_id.clone())) {
                HostFinish::Hosted { handle, released } => {
                    if released {
                        self.reopen_input();
                    }
                    info!(%token, %handle, %cloud_anchor_id, released, "anchor hosted");
                    self.emit(SessionEvent::Hosted {
                        token,
                        cloud_anchor_id: cloud_anchor_id.clone(),
                    });
                    self.emit(SessionEvent::DescribeAnchor(DescriptionCapture::new(
                        cloud_anchor_id,
                        Arc::clone(&self.directory),
                    )));
                }
                HostFinish::Discarded { .. } | HostFinish::Unknown => {
                    warn!(%token, "host completion for unknown request ignored");
                }
            },
            Err(error) => match self.store.finish_host(token, None) {
                HostFinish::Discarded { handle, released } => {
                    if released {
                        self.reopen_input();
                    }
                    self.tracking.detach_anchor(handle);
                    warn!(%token, %handle, %error, released, "hosting failed");
                    self.emit(SessionEvent::HostFailed { token, error });
                }
                HostFinish::Hosted { .. } | HostFinish::Unknown => {
                    warn!(%token, %error, "host failure for unknown request ignored");
                }
            },
        }
    }

    fn resolve_completed(
        &self,
        token: RequestToken,
        cloud_anchor_id: CloudAnchorId,
        outcome: Result<AnchorHandle, CloudAnchorError>,
    ) {
        if !self.is_active() {
            debug!(%token, %cloud_anchor_id, "stale resolve completion ignored");
            return;
        }
        if self.book().in_flight.remove(&token).is_none() {
            warn!(%token, %cloud_anchor_id, "resolve completion for unknown request ignored");
            return;
        }
        match outcome {
            Ok(handle) => match self.store.promote_to_resolved(&cloud_anchor_id, handle) {
                Promotion::Promoted {
                    remaining,
                    all_resolved,
                } => {
                    info!(%token, %handle, %cloud_anchor_id, remaining, "anchor resolved");
                    self.emit(SessionEvent::Resolved {
                        cloud_anchor_id,
                        remaining,
                    });
                    if all_resolved {
                        info!("all pending anchors resolved");
                        self.emit(SessionEvent::AllResolved);
                    }
                }
                Promotion::Untracked => self.tracking.detach_anchor(handle),
            },
            Err(error) => {
                warn!(%token, %cloud_anchor_id, %error, "resolve failed");
                self.emit(SessionEvent::ResolveFailed {
                    cloud_anchor_id,
                    error,
                });
            }
        }
        self.pump_resolves();
    }
}

impl<T: TrackingSession> std::fmt::Debug for CloudAnchorCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudAnchorCoordinator")
            .field("mode", &self.mode)
            .field("store", &self.store)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
