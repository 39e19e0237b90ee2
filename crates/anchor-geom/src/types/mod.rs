// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tracking-space geometry types (poses, plane boundaries).
//!
//! Containment on plane polygons uses the even-odd rule in the plane's local
//! `(x, z)` frame; points exactly on an edge are not guaranteed either way.

#[doc = "Measured plane boundaries and point containment."]
pub mod polygon;
#[doc = "Rigid anchor/hit poses."]
pub mod pose;
