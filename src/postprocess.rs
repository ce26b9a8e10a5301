//! Post-processing configuration: a scene render pass followed by bloom.
//!
//! This is the renderer-independent half of the composer. The GPU passes in
//! [`crate::render`] read these settings every frame.

use crate::viewport::Viewport;

/// Relative weights of the five bloom mip levels, finest first.
pub const BLOOM_FACTORS: [f32; 5] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Unreal-style bloom parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomSettings {
    /// Overall intensity of the glow added back onto the scene.
    pub strength: f32,
    /// Spread between fine and coarse mip levels, in `[0, 1]`.
    pub radius: f32,
    /// Luminance above which pixels contribute to the glow.
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 0.8,
            radius: 0.4,
            threshold: 0.7,
        }
    }
}

impl BloomSettings {
    pub fn new(strength: f32, radius: f32, threshold: f32) -> Self {
        Self {
            strength,
            radius,
            threshold,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            strength: self.strength.clamp(0.0, 3.0),
            radius: self.radius.clamp(0.0, 1.0),
            threshold: self.threshold.clamp(0.0, 1.0),
        }
    }

    /// Per-level weights: each factor is pushed towards `1.2 - factor` as the
    /// radius grows, then scaled by strength.
    pub fn level_weights(&self) -> [f32; 5] {
        BLOOM_FACTORS.map(|f| self.strength * (f + (1.2 - f - f) * self.radius))
    }
}

/// The passes composited every frame, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    Render,
    Bloom,
}

/// Composer configuration: pass order, bloom parameters, and bloom resolution.
#[derive(Clone, Debug)]
pub struct Postprocess {
    passes: Vec<PassKind>,
    pub bloom: BloomSettings,
    resolution: Viewport,
}

impl Postprocess {
    pub fn new(resolution: Viewport, bloom: BloomSettings) -> Self {
        Self {
            passes: vec![PassKind::Render, PassKind::Bloom],
            bloom,
            resolution,
        }
    }

    pub fn passes(&self) -> &[PassKind] {
        &self.passes
    }

    pub fn resolution(&self) -> Viewport {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: Viewport) {
        self.resolution = resolution;
    }
}
