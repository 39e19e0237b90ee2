// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used)]
//! Config, prefs and status-board behaviour.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anchor_app_core::prefs::{SessionPrefs, DEFAULT_MATCH_RADIUS_M, SESSION_PREFS_KEY};
use anchor_app_core::prefs_port::{ConfigError, ConfigStore, PrefsPort, PrefsService};
use anchor_app_core::status::{StatusBoard, StatusKind};
use anchor_dry_tests::InMemoryConfigStore;

fn store_with_blob(blob: &[u8]) -> InMemoryConfigStore {
    let mut data = HashMap::new();
    data.insert(SESSION_PREFS_KEY.to_string(), blob.to_vec());
    InMemoryConfigStore::with_data(data)
}

#[test]
fn missing_prefs_default_to_no_consent() {
    let svc = PrefsService::new(InMemoryConfigStore::new());
    assert!(svc.load_prefs().is_none());
    assert!(!svc.prefs_or_default().allow_share_images);
}

#[test]
fn accepting_notice_persists_consent() {
    let store = InMemoryConfigStore::new();
    let svc = PrefsService::new(store.clone());
    let prefs = svc.accept_share_notice();
    assert!(prefs.allow_share_images);
    let reloaded = svc.load().unwrap().unwrap();
    assert!(reloaded.allow_share_images);
    assert_eq!(store.save_count(), 1);
    assert!(store.contains_key(SESSION_PREFS_KEY));
}

#[test]
fn unreadable_prefs_fall_back_and_consent_still_granted_for_session() {
    let store = store_with_blob(b"{not json");
    store.set_fail_on_save(true);
    let svc = PrefsService::new(store);
    assert!(svc.load_prefs().is_none());
    assert!(svc.accept_share_notice().allow_share_images);
}

#[test]
fn empty_blob_loads_as_none() {
    let store = InMemoryConfigStore::new();
    store.save_raw(SESSION_PREFS_KEY, b"").unwrap();
    let svc = PrefsService::new(store);
    assert!(svc.load().unwrap().is_none());
}

#[test]
fn stored_out_of_range_tuning_loads_repaired() {
    let svc = PrefsService::new(store_with_blob(
        br#"{"allow_share_images":true,"match_radius_m":-1.0,"max_concurrent_resolves":0}"#,
    ));
    let prefs = svc.load().unwrap().unwrap();
    assert!(prefs.allow_share_images);
    assert!((prefs.match_radius_m - DEFAULT_MATCH_RADIUS_M).abs() < f32::EPSILON);
    assert_eq!(prefs.max_concurrent_resolves, None);
}

#[test]
fn saving_zero_resolve_cap_is_refused() {
    let store = InMemoryConfigStore::new();
    let svc = PrefsService::new(store.clone());
    let prefs = SessionPrefs {
        max_concurrent_resolves: Some(0),
        ..SessionPrefs::default()
    };
    assert!(matches!(
        svc.save(&prefs),
        Err(ConfigError::InvalidValue {
            field: "max_concurrent_resolves",
            ..
        })
    ));
    assert!(!svc.save_prefs(&prefs));
    assert_eq!(store.save_count(), 0);
}

#[test]
fn status_board_dedupes_within_window() {
    let mut board = StatusBoard::new(8);
    let t0 = Instant::now();
    let ttl = Duration::from_secs(4);
    let a = board.post(StatusKind::Processing, "Resolving anchors", None, ttl, t0);
    let b = board.post(
        StatusKind::Processing,
        "Resolving anchors",
        None,
        ttl,
        t0 + Duration::from_millis(100),
    );
    assert_eq!(a, b);
    assert_eq!(board.visible(t0 + Duration::from_millis(200)).len(), 1);
}

#[test]
fn status_board_expires_and_evicts_oldest() {
    let mut board = StatusBoard::new(2);
    let t0 = Instant::now();
    let ttl = Duration::from_secs(1);
    board.post(StatusKind::Success, "one", None, ttl, t0);
    board.post(StatusKind::Success, "two", None, ttl, t0);
    board.post(StatusKind::Error, "three", Some("details".into()), ttl, t0);
    let titles: Vec<_> = board.visible(t0).into_iter().map(|l| l.title).collect();
    assert_eq!(titles, vec!["two".to_string(), "three".to_string()]);

    board.retain_visible(t0 + Duration::from_secs(2));
    assert!(board.visible(t0 + Duration::from_secs(2)).is_empty());
    assert!(board.latest().is_none());
}
