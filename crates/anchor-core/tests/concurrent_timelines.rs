// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used)]
//! Frame loop and completion delivery running on separate threads against
//! one session.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anchor_core::{
    CloudAnchorId, EventPort, HostPhase, HostSlot, MemoryDirectory, Session, SessionConfig,
    SessionEvent, Tap, TapOutcome, UnresolvedAnchorDescriptor,
};
use anchor_dry_tests::{
    floor_hit, hosting_config, resolving_config, CompletionMode, RecordingRenderer,
    ScriptedTracking,
};

const DEADLINE: Duration = Duration::from_secs(20);

fn many_descriptors(n: usize) -> Vec<UnresolvedAnchorDescriptor> {
    (0..n)
        .map(|i| UnresolvedAnchorDescriptor::new(format!("A{i}"), format!("anchor {i}")))
        .collect()
}

/// Run frames on this thread while a second thread delivers every resolve.
/// Every frame's snapshot is checked; returns the frame count and the events
/// raised.
fn resolve_under_frames(config: SessionConfig, n: usize) -> (usize, Vec<SessionEvent>) {
    let tracking = Arc::new(ScriptedTracking::new(CompletionMode::Deferred));
    let (session, mut events) = Session::start(
        config,
        tracking.clone(),
        Arc::new(MemoryDirectory::new()),
        many_descriptors(n),
    )
    .unwrap();
    let done = AtomicBool::new(false);
    let started = Instant::now();

    let frames = thread::scope(|s| {
        let completer = s.spawn(|| {
            while started.elapsed() < DEADLINE {
                if tracking.complete_all_resolves() == 0 {
                    if tracking.pending_resolve_count() == 0 && session.resolves_in_flight() == 0 {
                        break;
                    }
                    thread::yield_now();
                }
            }
            done.store(true, Ordering::Release);
        });

        let mut renderer = RecordingRenderer::new();
        let mut frames = 0;
        let mut last_resolved = 0;
        loop {
            let finished = done.load(Ordering::Acquire);
            assert!(session.on_frame(&mut renderer).is_some());
            frames += 1;

            let snapshot = session.store().snapshot_for_render();
            let unresolved: HashSet<&CloudAnchorId> = snapshot.unresolved.iter().collect();
            for record in &snapshot.resolved {
                assert!(
                    !unresolved.contains(&record.cloud_anchor_id),
                    "{} is both unresolved and resolved",
                    record.cloud_anchor_id
                );
            }
            assert_eq!(snapshot.unresolved.len() + snapshot.resolved.len(), n);
            assert!(snapshot.resolved.len() >= last_resolved);
            last_resolved = snapshot.resolved.len();

            if finished {
                break;
            }
        }
        completer.join().unwrap();
        frames
    });

    (frames, events.drain_events(usize::MAX))
}

#[test]
fn resolves_from_another_thread_never_tear_a_snapshot() {
    let n = 32;
    let (frames, drained) = resolve_under_frames(resolving_config(), n);
    assert!(frames > 0);
    let all_resolved = drained
        .iter()
        .filter(|e| matches!(e, SessionEvent::AllResolved))
        .count();
    let resolved = drained
        .iter()
        .filter(|e| matches!(e, SessionEvent::Resolved { .. }))
        .count();
    assert_eq!(all_resolved, 1);
    assert_eq!(resolved, n);
}

#[test]
fn capped_resolves_from_another_thread_signal_once() {
    let n = 20;
    let config = resolving_config().with_resolve_cap(NonZeroUsize::new(3).unwrap());
    let (_, drained) = resolve_under_frames(config, n);
    let all_resolved = drained
        .iter()
        .filter(|e| matches!(e, SessionEvent::AllResolved))
        .count();
    let started = drained
        .iter()
        .filter(|e| matches!(e, SessionEvent::ResolveStarted { .. }))
        .count();
    assert_eq!(all_resolved, 1);
    assert_eq!(started, n);
}

#[test]
fn host_completions_from_another_thread_keep_one_host_in_flight() {
    let hosts = 12;
    let tracking = Arc::new(ScriptedTracking::new(CompletionMode::Deferred));
    tracking.set_hits(vec![floor_hit(0.0, 0.0)]);
    let (session, mut events) = Session::start(
        hosting_config(),
        tracking.clone(),
        Arc::new(MemoryDirectory::new()),
        vec![],
    )
    .unwrap();
    let started = Instant::now();

    thread::scope(|s| {
        let completer = s.spawn(|| {
            let mut completed = 0;
            while completed < hosts && started.elapsed() < DEADLINE {
                if tracking.complete_next_host() {
                    completed += 1;
                } else {
                    thread::yield_now();
                }
            }
            completed
        });

        let mut renderer = RecordingRenderer::new();
        let mut host_starts = 0;
        while host_starts < hosts && started.elapsed() < DEADLINE {
            session.on_tap(Tap::new(0.0, 0.0));
            let report = session.on_frame(&mut renderer).unwrap();
            if matches!(report.tap, TapOutcome::HostStarted(_)) {
                host_starts += 1;
            }
            assert!(!matches!(report.tap, TapOutcome::HostRejected(_)));

            let snapshot = session.store().snapshot_for_render();
            let requested = snapshot
                .hosted
                .iter()
                .filter(|r| r.phase == HostPhase::Requested)
                .count();
            assert!(requested <= 1);
            assert_eq!(snapshot.host_active, requested == 1);
        }
        assert_eq!(host_starts, hosts);
        assert_eq!(completer.join().unwrap(), hosts);
    });

    let hosted = session.store().hosted();
    assert_eq!(hosted.len(), hosts);
    assert!(hosted
        .iter()
        .all(|r| matches!(r.phase, HostPhase::Hosted(_))));
    assert_eq!(session.store().host_slot(), HostSlot::Idle);
    assert!(tracking.detached().is_empty());
    let hosted_events = events
        .drain_events(usize::MAX)
        .iter()
        .filter(|e| matches!(e, SessionEvent::Hosted { .. }))
        .count();
    assert_eq!(hosted_events, hosts);
}
