//! Front-to-back alpha compositing of force vectors

use crate::foundation::math::Vec3;

/// Running result of the override pass
///
/// Layers are composited front to back: the first layer with coverage 1
/// fully determines the result, partial layers blend with what lies behind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaAccumulator {
    alpha: f32,
    vector: Vec3,
}

impl Default for AlphaAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl AlphaAccumulator {
    /// Empty accumulator: no coverage, zero vector
    pub fn new() -> Self {
        Self {
            alpha: 0.0,
            vector: Vec3::zeros(),
        }
    }

    /// Accumulated coverage in `[0, 1]`
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Current blended vector
    pub fn vector(&self) -> Vec3 {
        self.vector
    }

    /// Whether further layers can no longer change the result
    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }

    /// Composite a layer behind everything accumulated so far
    ///
    /// Layers with no coverage are ignored. Coverage above 1 is clamped.
    pub fn composite(&mut self, vector: Vec3, strength: f32) {
        if strength <= 0.0 || self.is_opaque() {
            return;
        }
        let coverage = strength.min(1.0) * (1.0 - self.alpha);
        let alpha = self.alpha + coverage;
        self.vector = (self.vector * self.alpha + vector * coverage) / alpha;
        self.alpha = alpha;
    }

    /// Close the pass over a zero background and return the result
    pub fn finish(mut self) -> Vec3 {
        if !self.is_opaque() {
            self.composite(Vec3::zeros(), 1.0);
        }
        self.vector
    }
}
