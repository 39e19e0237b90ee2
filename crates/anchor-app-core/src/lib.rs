// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for AnchorFinder hosts: session prefs, their
//! storage port, and the status board.
//! Keeps platform shells thin and framework-agnostic.

pub mod prefs;
pub mod prefs_port;
pub mod status;
