// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Renderer fake that records draw calls.

use anchor_core::{AnchorRenderer, AnchorVisual};
use anchor_geom::math::Mat4;
use anchor_geom::PlanePolygon;

/// Records every draw call for later inspection.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    /// Anchor draws, in call order.
    pub anchors: Vec<(Mat4, AnchorVisual)>,
    /// Number of plane batches drawn.
    pub plane_batches: usize,
    /// Planes in the most recent batch.
    pub last_planes: Vec<PlanePolygon>,
}

impl RecordingRenderer {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor draws with the given visual.
    pub fn count(&self, visual: AnchorVisual) -> usize {
        self.anchors.iter().filter(|(_, v)| *v == visual).count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.anchors.clear();
        self.plane_batches = 0;
        self.last_planes.clear();
    }
}

impl AnchorRenderer for RecordingRenderer {
    fn draw_anchor(&mut self, model: &Mat4, visual: AnchorVisual) {
        self.anchors.push((*model, visual));
    }

    fn draw_planes(&mut self, planes: &[PlanePolygon]) {
        self.plane_batches += 1;
        self.last_planes = planes.to_vec();
    }
}
