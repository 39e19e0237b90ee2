// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ready-made scenes and configs.

use anchor_core::{HitCandidate, Mode, SessionConfig};
use anchor_geom::math::Vec3;
use anchor_geom::{PlanePolygon, Pose};

/// Half-extent of [`floor_plane`] along x and z, in metres.
pub const FLOOR_HALF_EXTENT: f32 = 1.0;

/// 2 m × 2 m floor plane centred on the origin.
pub fn floor_plane() -> PlanePolygon {
    PlanePolygon::rectangle(Pose::identity(), FLOOR_HALF_EXTENT, FLOOR_HALF_EXTENT)
}

/// Pose at `(x, y, z)` with identity orientation.
pub fn pose_at(x: f32, y: f32, z: f32) -> Pose {
    Pose::from_translation(Vec3::new(x, y, z))
}

/// Hit on [`floor_plane`] at `(x, 0, z)`.
pub fn floor_hit(x: f32, z: f32) -> HitCandidate {
    HitCandidate::on_plane(floor_plane(), pose_at(x, 0.0, z))
}

/// Feature-point hit at `(x, y, z)`.
pub fn point_hit(x: f32, y: f32, z: f32) -> HitCandidate {
    HitCandidate::on_point(pose_at(x, y, z))
}

/// Hosting config with consent granted.
pub fn hosting_config() -> SessionConfig {
    SessionConfig::new(Mode::Hosting).with_consent()
}

/// Resolving config with consent granted.
pub fn resolving_config() -> SessionConfig {
    SessionConfig::new(Mode::Resolving).with_consent()
}
