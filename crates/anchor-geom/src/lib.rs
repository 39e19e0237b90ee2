// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![doc = r"Geometry primitives for AnchorFinder.

This crate provides:
- Vectors, quaternions and column-major matrices (`math`).
- Rigid poses as reported by the tracking subsystem (`Pose`).
- Measured plane boundaries with point containment (`PlanePolygon`).

Design notes:
- Float32 throughout, matching the precision poses arrive in.
- Distances are plain Euclidean norms in metres; orientation never
  participates in proximity checks.
"]

/// Vectors, quaternions and matrices.
pub mod math;
/// Poses and plane polygons.
pub mod types;

pub use types::polygon::PlanePolygon;
pub use types::pose::Pose;
