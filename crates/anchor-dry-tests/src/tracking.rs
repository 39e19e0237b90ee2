// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scripted tracking subsystem: frames, hit tests and cloud completions are
//! all driven by the test.
//!
//! Completions run either immediately inside `host_anchor` / `resolve_anchor`
//! ([`CompletionMode::Immediate`]) or when the test calls one of the
//! `complete_*` methods ([`CompletionMode::Deferred`]). The fake never holds
//! its own lock while invoking a completer.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anchor_core::{
    AnchorHandle, AnchorSample, CloudAnchorError, CloudAnchorId, HitCandidate, HostCompleter,
    ResolveCompleter, Tap, TrackingError, TrackingFrame, TrackingSession, TrackingState,
};
use anchor_geom::{PlanePolygon, Pose};

/// When scripted completions are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Inside the submitting call, on the caller's thread.
    Immediate,
    /// Only when the test asks.
    #[default]
    Deferred,
}

/// Frame snapshot handed out by [`ScriptedTracking::update`].
#[derive(Debug, Clone)]
pub struct ScriptedFrame {
    camera: TrackingState,
    hits: Vec<HitCandidate>,
    planes: Vec<PlanePolygon>,
    anchors: BTreeMap<AnchorHandle, AnchorSample>,
}

impl TrackingFrame for ScriptedFrame {
    fn camera_tracking_state(&self) -> TrackingState {
        self.camera
    }

    fn hit_test(&self, _tap: &Tap) -> Vec<HitCandidate> {
        self.hits.clone()
    }

    fn anchor_sample(&self, handle: AnchorHandle) -> Option<AnchorSample> {
        self.anchors.get(&handle).copied()
    }

    fn planes(&self) -> Vec<PlanePolygon> {
        self.planes.clone()
    }
}

#[derive(Debug)]
struct Inner {
    mode: CompletionMode,
    camera: TrackingState,
    hits: Vec<HitCandidate>,
    planes: Vec<PlanePolygon>,
    anchors: BTreeMap<AnchorHandle, AnchorSample>,
    next_handle: u64,
    host_script: VecDeque<Result<CloudAnchorId, CloudAnchorError>>,
    resolve_script: HashMap<CloudAnchorId, Result<Pose, CloudAnchorError>>,
    pending_hosts: VecDeque<HostCompleter>,
    pending_resolves: VecDeque<ResolveCompleter>,
    detached: Vec<AnchorHandle>,
    host_calls: usize,
    resolve_calls: Vec<CloudAnchorId>,
    update_error: Option<TrackingError>,
    panic_on_update: bool,
    closed: bool,
}

/// Scripted [`TrackingSession`].
#[derive(Debug)]
pub struct ScriptedTracking {
    inner: Mutex<Inner>,
}

impl Default for ScriptedTracking {
    fn default() -> Self {
        Self::new(CompletionMode::default())
    }
}

/// What a scripted host or resolve completion resolves to once the lock is
/// released.
enum Delivery {
    Host(HostCompleter, Result<CloudAnchorId, CloudAnchorError>),
    Resolve(ResolveCompleter, Result<AnchorHandle, CloudAnchorError>),
}

impl Delivery {
    fn run(self) {
        match self {
            Self::Host(completer, outcome) => completer.complete(outcome),
            Self::Resolve(completer, outcome) => completer.complete(outcome),
        }
    }
}

impl ScriptedTracking {
    /// Tracking camera, no hits, nothing scripted.
    pub fn new(mode: CompletionMode) -> Self {
        Self {
            inner: Mutex::new(Inner {
                mode,
                camera: TrackingState::Tracking,
                hits: Vec::new(),
                planes: Vec::new(),
                anchors: BTreeMap::new(),
                next_handle: 1,
                host_script: VecDeque::new(),
                resolve_script: HashMap::new(),
                pending_hosts: VecDeque::new(),
                pending_resolves: VecDeque::new(),
                detached: Vec::new(),
                host_calls: 0,
                resolve_calls: Vec::new(),
                update_error: None,
                panic_on_update: false,
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Camera state reported by subsequent frames.
    pub fn set_camera(&self, state: TrackingState) {
        self.lock().camera = state;
    }

    /// Hit-test results for subsequent taps, in reported order.
    pub fn set_hits(&self, hits: Vec<HitCandidate>) {
        self.lock().hits = hits;
    }

    /// Planes reported by subsequent frames.
    pub fn set_planes(&self, planes: Vec<PlanePolygon>) {
        self.lock().planes = planes;
    }

    /// Change an anchor's tracking state.
    pub fn set_anchor_tracking(&self, handle: AnchorHandle, state: TrackingState) {
        if let Some(sample) = self.lock().anchors.get_mut(&handle) {
            sample.tracking = state;
        }
    }

    /// Queue the outcome of the next host completion. Unscripted hosts
    /// succeed with `cloud-<n>`, `n` being the number of host calls so far.
    pub fn script_host(&self, outcome: Result<CloudAnchorId, CloudAnchorError>) {
        self.lock().host_script.push_back(outcome);
    }

    /// Outcome for resolving `id`: the pose the anchor appears at, or an
    /// error. Unscripted resolves succeed at the identity pose.
    pub fn script_resolve(
        &self,
        id: impl Into<CloudAnchorId>,
        outcome: Result<Pose, CloudAnchorError>,
    ) {
        self.lock().resolve_script.insert(id.into(), outcome);
    }

    /// Make the next frames fail with `err` (`None` to recover).
    pub fn set_update_error(&self, err: Option<TrackingError>) {
        self.lock().update_error = err;
    }

    /// Make the next frames panic inside `update`.
    pub fn set_panic_on_update(&self, panic: bool) {
        self.lock().panic_on_update = panic;
    }

    /// Deliver the oldest deferred host completion. Returns `false` if none.
    pub fn complete_next_host(&self) -> bool {
        let delivery = {
            let mut inner = self.lock();
            let Some(completer) = inner.pending_hosts.pop_front() else {
                return false;
            };
            let outcome = inner.host_outcome();
            Delivery::Host(completer, outcome)
        };
        delivery.run();
        true
    }

    /// Deliver the deferred resolve completion for `id`. Returns `false` if
    /// none is pending.
    pub fn complete_resolve(&self, id: &str) -> bool {
        let delivery = {
            let mut inner = self.lock();
            let Some(pos) = inner
                .pending_resolves
                .iter()
                .position(|c| c.cloud_anchor_id().as_str() == id)
            else {
                return false;
            };
            let Some(completer) = inner.pending_resolves.remove(pos) else {
                return false;
            };
            let outcome = inner.resolve_outcome(completer.cloud_anchor_id());
            Delivery::Resolve(completer, outcome)
        };
        delivery.run();
        true
    }

    /// Deliver every deferred resolve completion currently pending, oldest
    /// first. Returns how many were delivered.
    pub fn complete_all_resolves(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self
                .lock()
                .pending_resolves
                .front()
                .map(|c| c.cloud_anchor_id().as_str().to_owned());
            match next {
                Some(id) if self.complete_resolve(&id) => delivered += 1,
                _ => break,
            }
        }
        delivered
    }

    /// Handles released through `detach_anchor`.
    pub fn detached(&self) -> Vec<AnchorHandle> {
        self.lock().detached.clone()
    }

    /// Anchors currently alive in the fake.
    pub fn live_anchors(&self) -> Vec<AnchorHandle> {
        self.lock().anchors.keys().copied().collect()
    }

    /// Number of `host_anchor` calls.
    pub fn host_calls(&self) -> usize {
        self.lock().host_calls
    }

    /// Ids passed to `resolve_anchor`, in call order.
    pub fn resolve_calls(&self) -> Vec<CloudAnchorId> {
        self.lock().resolve_calls.clone()
    }

    /// Deferred resolve completions still held.
    pub fn pending_resolve_count(&self) -> usize {
        self.lock().pending_resolves.len()
    }

    /// Deferred host completions still held.
    pub fn pending_host_count(&self) -> usize {
        self.lock().pending_hosts.len()
    }

    /// `true` once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Inner {
    fn mint(&mut self, pose: Pose) -> AnchorHandle {
        let handle = AnchorHandle(self.next_handle);
        self.next_handle += 1;
        self.anchors.insert(
            handle,
            AnchorSample {
                tracking: TrackingState::Tracking,
                pose,
            },
        );
        handle
    }

    fn host_outcome(&mut self) -> Result<CloudAnchorId, CloudAnchorError> {
        self.host_script
            .pop_front()
            .unwrap_or_else(|| Ok(CloudAnchorId::new(format!("cloud-{}", self.host_calls))))
    }

    fn resolve_outcome(&mut self, id: &CloudAnchorId) -> Result<AnchorHandle, CloudAnchorError> {
        let scripted = self
            .resolve_script
            .get(id)
            .cloned()
            .unwrap_or(Ok(Pose::identity()));
        scripted.map(|pose| self.mint(pose))
    }
}

impl TrackingSession for ScriptedTracking {
    type Frame = ScriptedFrame;

    #[allow(clippy::panic)]
    fn update(&self) -> Result<ScriptedFrame, TrackingError> {
        let inner = self.lock();
        if inner.closed {
            return Err(TrackingError::Closed);
        }
        if let Some(err) = inner.update_error.clone() {
            return Err(err);
        }
        if inner.panic_on_update {
            drop(inner);
            panic!("scripted tracking panic");
        }
        Ok(ScriptedFrame {
            camera: inner.camera,
            hits: inner.hits.clone(),
            planes: inner.planes.clone(),
            anchors: inner.anchors.clone(),
        })
    }

    fn create_anchor(&self, hit: &HitCandidate) -> Result<AnchorHandle, TrackingError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(TrackingError::Closed);
        }
        Ok(inner.mint(hit.hit_pose))
    }

    fn detach_anchor(&self, handle: AnchorHandle) {
        let mut inner = self.lock();
        inner.anchors.remove(&handle);
        inner.detached.push(handle);
    }

    fn host_anchor(&self, _handle: AnchorHandle, completer: HostCompleter) {
        let delivery = {
            let mut inner = self.lock();
            inner.host_calls += 1;
            match inner.mode {
                CompletionMode::Deferred => {
                    inner.pending_hosts.push_back(completer);
                    None
                }
                CompletionMode::Immediate => {
                    let outcome = inner.host_outcome();
                    Some(Delivery::Host(completer, outcome))
                }
            }
        };
        if let Some(delivery) = delivery {
            delivery.run();
        }
    }

    fn resolve_anchor(&self, cloud_anchor_id: &CloudAnchorId, completer: ResolveCompleter) {
        let delivery = {
            let mut inner = self.lock();
            inner.resolve_calls.push(cloud_anchor_id.clone());
            match inner.mode {
                CompletionMode::Deferred => {
                    inner.pending_resolves.push_back(completer);
                    None
                }
                CompletionMode::Immediate => {
                    let outcome = inner.resolve_outcome(cloud_anchor_id);
                    Some(Delivery::Resolve(completer, outcome))
                }
            }
        };
        if let Some(delivery) = delivery {
            delivery.run();
        }
    }

    fn close(&self) {
        self.lock().closed = true;
    }
}
