// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for AnchorFinder crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`fixtures`] - Floor plane, hit and config builders
//! - [`render`] - Renderer that records draw calls
//! - [`tracking`] - Scripted tracking subsystem with immediate or deferred completions

pub mod config;
pub mod fixtures;
pub mod render;
pub mod tracking;

pub use config::InMemoryConfigStore;
pub use fixtures::{
    floor_hit, floor_plane, hosting_config, point_hit, pose_at, resolving_config,
    FLOOR_HALF_EXTENT,
};
pub use render::RecordingRenderer;
pub use tracking::{CompletionMode, ScriptedFrame, ScriptedTracking};
