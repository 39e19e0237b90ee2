// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used)]
//! Properties of tap hand-off, host-hit selection, resolve matching and
//! store promotion.

use anchor_core::{
    select_host_hit, select_resolve_match, AnchorHandle, AnchorSample, AnchorStore, HitCandidate,
    MatchRadius, Promotion, ResolvedAnchorRecord, Tap, TapRouter, TrackedAnchor, TrackingState,
    UnresolvedAnchorDescriptor,
};
use anchor_dry_tests::{floor_hit, point_hit, pose_at};
use proptest::prelude::*;

/// 0 = feature point, 1 = inside the floor plane, 2 = on the plane but outside it.
fn candidate(kind: u8, i: usize) -> HitCandidate {
    #[allow(clippy::cast_precision_loss)]
    let offset = (i % 10) as f32 * 0.05;
    match kind {
        0 => point_hit(offset, 0.0, 0.0),
        1 => floor_hit(offset, -offset),
        _ => floor_hit(3.0 + offset, 0.0),
    }
}

fn tracked(id: &str, x: f32, y: f32, z: f32, tracking: TrackingState) -> TrackedAnchor {
    TrackedAnchor {
        record: ResolvedAnchorRecord {
            cloud_anchor_id: id.into(),
            description: format!("{id} description"),
            handle: AnchorHandle(1),
        },
        sample: AnchorSample {
            tracking,
            pose: pose_at(x, y, z),
        },
    }
}

#[test]
fn boundary_distance_is_exclusive() {
    let radius = MatchRadius::default();
    let anchors = [tracked("A1", 0.0, 0.0, 0.0, TrackingState::Tracking)];
    let inside = [point_hit(0.699_999, 0.0, 0.0)];
    let at = [point_hit(0.7, 0.0, 0.0)];
    assert!(select_resolve_match(&inside, &anchors, radius).is_some());
    assert!(select_resolve_match(&at, &anchors, radius).is_none());
}

#[test]
fn first_tracking_anchor_in_range_wins() {
    let anchors = [
        tracked("paused", 0.0, 0.0, 0.0, TrackingState::Paused),
        tracked("far", 2.0, 0.0, 0.0, TrackingState::Tracking),
        tracked("near", 0.3, 0.0, 0.0, TrackingState::Tracking),
        tracked("nearer", 0.1, 0.0, 0.0, TrackingState::Tracking),
    ];
    let hit = [point_hit(0.0, 0.0, 0.0)];
    let found = select_resolve_match(&hit, &anchors, MatchRadius::default()).unwrap();
    assert_eq!(found.record.cloud_anchor_id.as_str(), "near");
}

#[test]
fn promotion_succeeds_once() {
    let store = AnchorStore::new();
    store.seed_unresolved([UnresolvedAnchorDescriptor::new("A1", "Kitchen table")]);
    let first = store.promote_to_resolved(&"A1".into(), AnchorHandle(9));
    assert_eq!(
        first,
        Promotion::Promoted {
            remaining: 0,
            all_resolved: true
        }
    );
    assert_eq!(
        store.promote_to_resolved(&"A1".into(), AnchorHandle(10)),
        Promotion::Untracked
    );
    let resolved = store.resolved();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].description, "Kitchen table");
    assert_eq!(resolved[0].handle, AnchorHandle(9));
}

proptest! {
    #[test]
    fn consume_returns_only_latest_tap_per_frame(
        bursts in prop::collection::vec(
            prop::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 0..6),
            1..20,
        )
    ) {
        let router = TapRouter::new();
        for burst in bursts {
            for &(x, y) in &burst {
                router.on_tap(Tap::new(x, y));
            }
            let expected = burst.last().map(|&(x, y)| Tap::new(x, y));
            prop_assert_eq!(router.consume_tap(), expected);
            prop_assert_eq!(router.consume_tap(), None);
        }
    }

    #[test]
    fn host_hit_is_first_plane_hit_inside_polygon(
        kinds in prop::collection::vec(0u8..3, 0..12)
    ) {
        let candidates: Vec<HitCandidate> = kinds
            .iter()
            .enumerate()
            .map(|(i, &k)| candidate(k, i))
            .collect();
        let expected = kinds.iter().position(|&k| k == 1);
        let picked = select_host_hit(&candidates);
        match expected {
            Some(idx) => {
                prop_assert!(picked.is_some_and(|p| std::ptr::eq(p, &candidates[idx])));
            }
            None => prop_assert!(picked.is_none()),
        }
    }

    #[test]
    fn resolve_match_agrees_with_brute_force(
        anchors in prop::collection::vec(
            (-2.0f32..2.0, -2.0f32..2.0, -2.0f32..2.0, any::<bool>()),
            0..8,
        ),
        hit in (-2.0f32..2.0, -2.0f32..2.0, -2.0f32..2.0),
    ) {
        let radius = MatchRadius::default();
        let tracked_anchors: Vec<TrackedAnchor> = anchors
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z, on))| {
                let state = if on { TrackingState::Tracking } else { TrackingState::Paused };
                tracked(&format!("A{i}"), x, y, z, state)
            })
            .collect();
        let hit_pose = pose_at(hit.0, hit.1, hit.2);
        let expected = tracked_anchors.iter().position(|a| {
            a.is_tracking() && radius.admits(a.sample.pose.distance_to(&hit_pose))
        });
        let candidates = [HitCandidate::on_point(hit_pose)];
        let picked = select_resolve_match(&candidates, &tracked_anchors, radius);
        match expected {
            Some(idx) => {
                prop_assert!(picked.is_some_and(|p| std::ptr::eq(p, &tracked_anchors[idx])));
            }
            None => prop_assert!(picked.is_none()),
        }
    }
}
