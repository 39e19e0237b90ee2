// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! anchor-sim: drives a scripted hosting session and then a resolving session
//! against in-memory fakes, logging every session event.
//!
//! Exits non-zero if the run does not end with every hosted anchor published,
//! resolved and tappable.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anchor_app_core::prefs::SessionPrefs;
use anchor_app_core::prefs_port::{PrefsPort, PrefsService};
use anchor_app_core::status::StatusBoard;
use anchor_config_fs::FsConfigStore;
use anchor_core::{
    AnchorDirectory, ChannelEvents, CloudAnchorError, CloudAnchorId, EventPort, HitCandidate,
    MemoryDirectory, Mode, Session, SessionConfig, SessionEvent, Tap, TapOutcome,
};
use anchor_dry_tests::{point_hit, pose_at, CompletionMode, RecordingRenderer, ScriptedTracking};
use anchor_geom::PlanePolygon;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Spacing between hosted anchors along x, in metres. Wider than the match
/// radius so each resolve tap selects exactly one anchor.
const ANCHOR_SPACING_M: f32 = 1.5;

/// Half-extent of the tabletop plane generated under each anchor.
const TABLE_HALF_EXTENT_M: f32 = 0.5;

#[derive(Parser, Debug)]
#[command(author, version, about = "AnchorFinder scripted session runner")]
struct Args {
    /// Number of anchors to host and then resolve.
    #[arg(long, default_value_t = 3)]
    anchors: usize,
    /// Cap on outstanding resolve requests (overrides saved preferences).
    #[arg(long)]
    resolve_cap: Option<NonZeroUsize>,
    /// Record image-sharing consent before starting.
    #[arg(long)]
    accept_share_notice: bool,
    /// Config directory (defaults to the platform config dir).
    #[arg(long)]
    config_dir: Option<PathBuf>,
    /// Fail the next N host requests with a scripted service error.
    #[arg(long, default_value_t = 0)]
    failed_hosts: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let store = match &args.config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("open config store")?;
    let prefs = PrefsService::new(store);
    let mut saved = if args.accept_share_notice {
        prefs.accept_share_notice()
    } else {
        prefs.prefs_or_default()
    };
    if let Some(cap) = args.resolve_cap {
        saved.max_concurrent_resolves = Some(cap.get());
    }

    let directory = Arc::new(MemoryDirectory::new());
    let mut board = StatusBoard::new(8);

    let published = host_anchors(&args, &saved, &directory, &mut board)?;
    if published.len() != args.anchors {
        bail!("published {} of {} anchors", published.len(), args.anchors);
    }
    resolve_anchors(&saved, &published, &directory, &mut board)?;
    info!(anchors = published.len(), "simulation complete");
    Ok(())
}

/// Hosting pass: tap a plane once per anchor and publish a description for
/// each successful host. Returns `(id, x)` for every published anchor.
fn host_anchors(
    args: &Args,
    prefs: &SessionPrefs,
    directory: &Arc<MemoryDirectory>,
    board: &mut StatusBoard,
) -> Result<Vec<(CloudAnchorId, f32)>> {
    let config = SessionConfig::from_prefs(Mode::Hosting, prefs).context("hosting config")?;
    let tracking = Arc::new(ScriptedTracking::new(CompletionMode::Immediate));
    for _ in 0..args.failed_hosts {
        tracking.script_host(Err(CloudAnchorError::ServiceUnavailable));
    }
    let shared: Arc<dyn AnchorDirectory> = directory.clone();
    let (session, mut events) = Session::start(config, tracking.clone(), shared, Vec::new())
        .context("start hosting session")?;
    let mut renderer = RecordingRenderer::new();

    let mut published = Vec::new();
    let mut attempts = 0;
    while published.len() < args.anchors {
        if attempts >= args.anchors + args.failed_hosts {
            break;
        }
        #[allow(clippy::cast_precision_loss)]
        let x = published.len() as f32 * ANCHOR_SPACING_M;
        let table = PlanePolygon::rectangle(
            pose_at(x, 0.0, 0.0),
            TABLE_HALF_EXTENT_M,
            TABLE_HALF_EXTENT_M,
        );
        tracking.set_planes(vec![table.clone()]);
        tracking.set_hits(vec![HitCandidate::on_plane(table, pose_at(x, 0.0, 0.1))]);
        session.on_tap(Tap::new(0.0, 0.0));
        if let Some(report) = session.on_frame(&mut renderer) {
            info!(tap = ?report.tap, drawn = report.anchors_drawn, "hosting frame");
        }
        attempts += 1;
        for event in drain(&mut events, board) {
            if let SessionEvent::DescribeAnchor(mut capture) = event {
                let description = format!("Anchor {}", published.len() + 1);
                let record = capture
                    .submit(&description)
                    .context("publish description")?;
                info!(id = %record.hosted_anchor_id, %description, "published");
                published.push((capture.cloud_anchor_id().clone(), x));
            }
        }
    }
    session.shutdown();
    Ok(published)
}

/// Resolving pass: list the directory, resolve everything, then tap the first
/// anchor and expect its description.
fn resolve_anchors(
    prefs: &SessionPrefs,
    published: &[(CloudAnchorId, f32)],
    directory: &Arc<MemoryDirectory>,
    board: &mut StatusBoard,
) -> Result<()> {
    let config = SessionConfig::from_prefs(Mode::Resolving, prefs).context("resolving config")?;
    let tracking = Arc::new(ScriptedTracking::new(CompletionMode::Deferred));
    for (id, x) in published {
        tracking.script_resolve(id.clone(), Ok(pose_at(*x, 0.0, 0.0)));
    }
    let shared: Arc<dyn AnchorDirectory> = directory.clone();
    let (session, mut events) = Session::start(config, tracking.clone(), shared, Vec::new())
        .context("start resolving session")?;
    session.seed_from_directory();

    let mut all_resolved = 0;
    loop {
        let delivered = tracking.complete_all_resolves();
        all_resolved += drain(&mut events, board)
            .iter()
            .filter(|e| matches!(e, SessionEvent::AllResolved))
            .count();
        if delivered == 0 {
            break;
        }
    }
    if all_resolved != 1 {
        bail!("expected one all-resolved signal, saw {all_resolved}");
    }

    let (first_id, first_x) = published
        .first()
        .ok_or_else(|| anyhow!("nothing was published"))?;
    tracking.set_hits(vec![point_hit(*first_x, 0.0, 0.0)]);
    session.on_tap(Tap::new(0.0, 0.0));
    let mut renderer = RecordingRenderer::new();
    let report = session
        .on_frame(&mut renderer)
        .ok_or_else(|| anyhow!("resolving frame failed"))?;
    if report.tap != TapOutcome::Matched(first_id.clone()) {
        bail!("tap did not select {first_id}: {:?}", report.tap);
    }
    for event in drain(&mut events, board) {
        if let SessionEvent::ShowDescription { description, .. } = event {
            info!(%first_id, %description, "tap matched");
        }
    }
    info!(
        drawn = report.anchors_drawn,
        resolved = session.store().resolved().len(),
        "resolving frame"
    );
    session.shutdown();
    Ok(())
}

/// Drain pending events, mirror them onto the status board and log the board.
fn drain(events: &mut ChannelEvents, board: &mut StatusBoard) -> Vec<SessionEvent> {
    let now = Instant::now();
    let drained = events.drain_events(64);
    for event in &drained {
        event.post_to(board, now);
        if let SessionEvent::HostFailed { error, .. } | SessionEvent::ResolveFailed { error, .. } =
            event
        {
            warn!(%error, "request failed");
        }
    }
    board.retain_visible(now);
    for line in board.visible(now) {
        info!(kind = ?line.kind, title = %line.title, body = ?line.body, "status");
    }
    drained
}
