// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::{Mat4, Quat, Vec3};

/// Rigid pose (translation + orientation) reported by the tracking subsystem.
///
/// Conventions:
/// - `translation` in metres, tracking (world) space.
/// - `rotation` as a unit quaternion; normalised when converting.
/// - No scale: anchors, hits and plane centres are rigid frames.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pose {
    translation: Vec3,
    rotation: Quat,
}

impl Pose {
    /// Identity pose at the tracking origin.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::identity(),
        }
    }

    /// Creates a pose from components.
    #[must_use]
    pub const fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Pose at `translation` with identity orientation.
    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::identity())
    }

    /// Translation component.
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// Rotation component.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Euclidean distance between the positions of two poses.
    ///
    /// Orientation does not participate.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f32 {
        self.translation.distance(&other.translation)
    }

    /// Maps a point from this pose's local frame into world space.
    #[must_use]
    pub fn transform_point(&self, local: &Vec3) -> Vec3 {
        self.rotation.rotate(local).add(&self.translation)
    }

    /// Maps a world-space point into this pose's local frame.
    #[must_use]
    pub fn inverse_transform_point(&self, world: &Vec3) -> Vec3 {
        self.rotation
            .conjugate()
            .rotate(&world.sub(&self.translation))
    }

    /// Column-major model matrix `M = T * R`.
    #[must_use]
    pub fn to_mat4(&self) -> Mat4 {
        let [tx, ty, tz] = self.translation.to_array();
        Mat4::translation(tx, ty, tz).multiply(&self.rotation.to_mat4())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}
