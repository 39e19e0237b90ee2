// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::math::Vec3;
use crate::types::pose::Pose;

/// Measured boundary of a detected plane.
///
/// Vertices are `(x, z)` pairs in the plane's local frame (the frame of
/// `center`), where the plane's normal is local +Y. This mirrors how tracking
/// subsystems publish plane extents.
///
/// Invariants:
/// - Fewer than three vertices describe no area; such polygons contain nothing.
/// - Winding order does not matter; containment uses the even-odd rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanePolygon {
    center: Pose,
    vertices: Vec<[f32; 2]>,
}

impl PlanePolygon {
    /// Creates a polygon anchored at `center` with local `(x, z)` vertices.
    #[must_use]
    pub fn new(center: Pose, vertices: Vec<[f32; 2]>) -> Self {
        Self { center, vertices }
    }

    /// Axis-aligned rectangle of half-extents `hx`, `hz` around `center`.
    #[must_use]
    pub fn rectangle(center: Pose, hx: f32, hz: f32) -> Self {
        Self::new(center, vec![[-hx, -hz], [hx, -hz], [hx, hz], [-hx, hz]])
    }

    /// Centre pose of the plane.
    #[must_use]
    pub fn center(&self) -> Pose {
        self.center
    }

    /// Local `(x, z)` vertices.
    #[must_use]
    pub fn vertices(&self) -> &[[f32; 2]] {
        &self.vertices
    }

    /// Returns `true` if `pose`'s position, projected onto the plane, falls
    /// inside the polygon.
    ///
    /// The offset along the plane normal is ignored; a hit pose produced by a
    /// hit test against this plane lies on it up to float error.
    #[must_use]
    pub fn contains_pose(&self, pose: &Pose) -> bool {
        self.contains_point(&pose.translation())
    }

    /// World-space point variant of [`Self::contains_pose`].
    #[must_use]
    pub fn contains_point(&self, world: &Vec3) -> bool {
        if self.vertices.len() < 3 || !world.is_finite() {
            return false;
        }
        let local = self.center.inverse_transform_point(world);
        let (px, pz) = (local.x(), local.z());

        let mut inside = false;
        let mut j = self.vertices.len() - 1;
        for (i, &[xi, zi]) in self.vertices.iter().enumerate() {
            let [xj, zj] = self.vertices[j];
            if (zi > pz) != (zj > pz) {
                let x_cross = (xj - xi) * (pz - zi) / (zj - zi) + xi;
                if px < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}
