// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Authoritative in-process anchor state, guarded by a single anchor lock.
//!
//! Every mutation and every render snapshot takes the same lock, so the frame
//! timeline and the completion timeline never observe a half-updated list.
//! The lock is never held while calling into a collaborator.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::HostRejected;
use crate::ids::{AnchorHandle, CloudAnchorId, RequestToken};
use crate::model::{AnchorRecord, HostPhase, ResolvedAnchorRecord, UnresolvedAnchorDescriptor};

/// The "one active host" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostSlot {
    /// No host request in flight; a new hit may start one.
    #[default]
    Idle,
    /// The given request owns the slot until it completes.
    Active(RequestToken),
}

/// Result of [`AnchorStore::promote_to_resolved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    /// Moved from unresolved to resolved.
    Promoted {
        /// Descriptors still awaiting resolution.
        remaining: usize,
        /// `true` exactly once per session: on the promotion that emptied the
        /// unresolved set.
        all_resolved: bool,
    },
    /// The id was not in the unresolved set (already promoted or never
    /// seeded); nothing changed.
    Untracked,
}

impl Promotion {
    /// `true` if the call moved the anchor.
    pub fn is_promoted(self) -> bool {
        matches!(self, Self::Promoted { .. })
    }
}

/// Result of [`AnchorStore::finish_host`].
///
/// `released` is `true` only if the completing request still owned the host
/// slot. A request whose slot was cleared early completes with `false`, and
/// whatever request holds the slot now keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFinish {
    /// Record updated to `Hosted`.
    Hosted {
        /// Local anchor that was hosted.
        handle: AnchorHandle,
        /// This completion freed the host slot.
        released: bool,
    },
    /// Record removed; the caller should detach `handle`.
    Discarded {
        /// Local anchor that failed to host.
        handle: AnchorHandle,
        /// This completion freed the host slot.
        released: bool,
    },
    /// No pending record for that token (stale completion).
    Unknown,
}

/// Consistent copy of the drawable lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSnapshot {
    /// Resolved anchors, in resolution order.
    pub resolved: Vec<ResolvedAnchorRecord>,
    /// Locally placed anchors, in placement order.
    pub hosted: Vec<AnchorRecord>,
    /// Ids still awaiting resolution, in seed order.
    pub unresolved: Vec<CloudAnchorId>,
    /// Whether a host request currently owns the slot.
    pub host_active: bool,
}

#[derive(Debug, Default)]
struct StoreState {
    hosted: Vec<AnchorRecord>,
    unresolved: Vec<UnresolvedAnchorDescriptor>,
    resolved: Vec<ResolvedAnchorRecord>,
    host_slot: HostSlot,
    all_resolved_signalled: bool,
}

impl StoreState {
    fn push_hosted(&mut self, record: AnchorRecord) {
        debug!(token = %record.token, handle = %record.handle, "anchor added to host list");
        self.hosted.push(record);
    }
}

/// Thread-safe anchor store; owns its lock.
#[derive(Debug, Default)]
pub struct AnchorStore {
    state: Mutex<StoreState>,
}

impl AnchorStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed descriptors to resolve. Ids already unresolved or resolved are
    /// skipped so an id never sits in both collections.
    pub fn seed_unresolved(
        &self,
        descriptors: impl IntoIterator<Item = UnresolvedAnchorDescriptor>,
    ) -> usize {
        let mut state = self.lock();
        let mut added = 0;
        for descriptor in descriptors {
            let id = &descriptor.cloud_anchor_id;
            let known = state.unresolved.iter().any(|d| &d.cloud_anchor_id == id)
                || state.resolved.iter().any(|r| &r.cloud_anchor_id == id);
            if known {
                debug!(cloud_anchor_id = %id, "duplicate descriptor ignored");
                continue;
            }
            state.unresolved.push(descriptor);
            added += 1;
        }
        added
    }

    /// Append a locally placed anchor to the host-anchor list without
    /// claiming the host slot. Host requests go through [`Self::begin_host`],
    /// which claims the slot and appends in one locked step.
    pub fn add_pending_host(&self, record: AnchorRecord) {
        self.lock().push_hosted(record);
    }

    /// Claim the host slot for `token` and register `handle` as
    /// [`HostPhase::Requested`] in one step.
    pub fn begin_host(&self, token: RequestToken, handle: AnchorHandle) -> Result<(), HostRejected> {
        let mut state = self.lock();
        if let HostSlot::Active(current) = state.host_slot {
            return Err(HostRejected::Busy(current));
        }
        state.host_slot = HostSlot::Active(token);
        state.push_hosted(AnchorRecord {
            token,
            handle,
            phase: HostPhase::Requested,
        });
        Ok(())
    }

    /// Apply a host completion for `token`.
    ///
    /// Success marks the record hosted; failure removes it. Either way the
    /// slot is released if `token` owned it, and only then.
    pub fn finish_host(&self, token: RequestToken, outcome: Option<CloudAnchorId>) -> HostFinish {
        let mut state = self.lock();
        let released = state.host_slot == HostSlot::Active(token);
        if released {
            state.host_slot = HostSlot::Idle;
        }
        let Some(idx) = state.hosted.iter().position(|r| r.token == token) else {
            return HostFinish::Unknown;
        };
        if state.hosted[idx].phase != HostPhase::Requested {
            return HostFinish::Unknown;
        }
        match outcome {
            Some(cloud_anchor_id) => {
                let record = &mut state.hosted[idx];
                record.phase = HostPhase::Hosted(cloud_anchor_id);
                HostFinish::Hosted {
                    handle: record.handle,
                    released,
                }
            }
            None => HostFinish::Discarded {
                handle: state.hosted.remove(idx).handle,
                released,
            },
        }
    }

    /// Release the host slot without completing the request.
    pub fn clear_active_host(&self) {
        self.lock().host_slot = HostSlot::Idle;
    }

    /// Current host slot.
    pub fn host_slot(&self) -> HostSlot {
        self.lock().host_slot
    }

    /// Move `cloud_anchor_id` from unresolved to resolved, carrying over its
    /// description. Atomic under the anchor lock.
    pub fn promote_to_resolved(
        &self,
        cloud_anchor_id: &CloudAnchorId,
        handle: AnchorHandle,
    ) -> Promotion {
        let mut state = self.lock();
        let Some(idx) = state
            .unresolved
            .iter()
            .position(|d| &d.cloud_anchor_id == cloud_anchor_id)
        else {
            warn!(%cloud_anchor_id, "resolve completion for untracked anchor ignored");
            return Promotion::Untracked;
        };
        let descriptor = state.unresolved.remove(idx);
        state.resolved.push(ResolvedAnchorRecord {
            cloud_anchor_id: descriptor.cloud_anchor_id,
            description: descriptor.description,
            handle,
        });
        let remaining = state.unresolved.len();
        let all_resolved = remaining == 0 && !state.all_resolved_signalled;
        if all_resolved {
            state.all_resolved_signalled = true;
        }
        Promotion::Promoted {
            remaining,
            all_resolved,
        }
    }

    /// Consistent copies of the resolved and host-anchor lists plus the ids
    /// still pending, all read under one lock acquisition.
    pub fn snapshot_for_render(&self) -> RenderSnapshot {
        let state = self.lock();
        RenderSnapshot {
            resolved: state.resolved.clone(),
            hosted: state.hosted.clone(),
            unresolved: state
                .unresolved
                .iter()
                .map(|d| d.cloud_anchor_id.clone())
                .collect(),
            host_active: state.host_slot != HostSlot::Idle,
        }
    }

    /// Ids still awaiting resolution, in seed order.
    pub fn unresolved_ids(&self) -> Vec<CloudAnchorId> {
        self.lock()
            .unresolved
            .iter()
            .map(|d| d.cloud_anchor_id.clone())
            .collect()
    }

    /// Copy of the unresolved descriptors.
    pub fn unresolved(&self) -> Vec<UnresolvedAnchorDescriptor> {
        self.lock().unresolved.clone()
    }

    /// Copy of the resolved records.
    pub fn resolved(&self) -> Vec<ResolvedAnchorRecord> {
        self.lock().resolved.clone()
    }

    /// Copy of the host-anchor list.
    pub fn hosted(&self) -> Vec<AnchorRecord> {
        self.lock().hosted.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TokenSource;

    #[test]
    fn second_begin_host_is_rejected_until_finish() {
        let store = AnchorStore::new();
        let tokens = TokenSource::new();
        let first = tokens.next();
        store.begin_host(first, AnchorHandle(1)).ok();
        assert_eq!(
            store.begin_host(tokens.next(), AnchorHandle(2)),
            Err(HostRejected::Busy(first))
        );
        assert_eq!(
            store.finish_host(first, Some("c1".into())),
            HostFinish::Hosted {
                handle: AnchorHandle(1),
                released: true
            }
        );
        assert!(store.begin_host(tokens.next(), AnchorHandle(3)).is_ok());
        assert_eq!(store.hosted().len(), 2);
    }

    #[test]
    fn failed_host_is_removed_and_slot_released() {
        let store = AnchorStore::new();
        let token = TokenSource::new().next();
        store.begin_host(token, AnchorHandle(7)).ok();
        assert_eq!(
            store.finish_host(token, None),
            HostFinish::Discarded {
                handle: AnchorHandle(7),
                released: true
            }
        );
        assert!(store.hosted().is_empty());
        assert_eq!(store.host_slot(), HostSlot::Idle);
        assert_eq!(store.finish_host(token, None), HostFinish::Unknown);
    }

    #[test]
    fn completion_after_clear_leaves_new_owner_in_slot() {
        let store = AnchorStore::new();
        let tokens = TokenSource::new();
        let first = tokens.next();
        let second = tokens.next();
        store.begin_host(first, AnchorHandle(1)).ok();
        store.clear_active_host();
        store.begin_host(second, AnchorHandle(2)).ok();
        assert_eq!(
            store.finish_host(first, Some("c1".into())),
            HostFinish::Hosted {
                handle: AnchorHandle(1),
                released: false
            }
        );
        assert_eq!(store.host_slot(), HostSlot::Active(second));
        assert_eq!(
            store.finish_host(second, None),
            HostFinish::Discarded {
                handle: AnchorHandle(2),
                released: true
            }
        );
        assert_eq!(store.host_slot(), HostSlot::Idle);
    }

    #[test]
    fn pending_host_is_drawn_without_claiming_slot() {
        let store = AnchorStore::new();
        let record = AnchorRecord {
            token: TokenSource::new().next(),
            handle: AnchorHandle(4),
            phase: HostPhase::Requested,
        };
        store.add_pending_host(record.clone());
        let snapshot = store.snapshot_for_render();
        assert_eq!(snapshot.hosted, vec![record]);
        assert!(!snapshot.host_active);
        assert_eq!(store.host_slot(), HostSlot::Idle);
    }

    #[test]
    fn seeding_skips_known_ids() {
        let store = AnchorStore::new();
        let d = UnresolvedAnchorDescriptor::new("A1", "one");
        assert_eq!(store.seed_unresolved([d.clone(), d.clone()]), 1);
        store.promote_to_resolved(&"A1".into(), AnchorHandle(1));
        assert_eq!(store.seed_unresolved([d]), 0);
        assert!(store.unresolved().is_empty());
    }
}
