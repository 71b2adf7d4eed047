//! Brush tip masks and their cache

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::constants::MAX_TIP_RADIUS;

/// A rendered circular coverage mask
#[derive(Debug, Clone, PartialEq)]
pub struct BrushTip {
    pub radius: u32,
    pub hardness: f32,
    /// Edge length of the square mask (`2 * radius`)
    pub size: u32,
    /// Row-major coverage in [0, 1]
    coverage: Vec<f32>,
}

impl BrushTip {
    /// Render a mask. Fully opaque out to `hardness * radius`, then a
    /// linear fade to transparent at `radius`. Radius is clamped to
    /// `1..=MAX_TIP_RADIUS`.
    pub fn render(radius: u32, hardness: f32) -> Self {
        let radius = radius.clamp(1, MAX_TIP_RADIUS);
        let hardness = hardness.clamp(0.0, 1.0);
        let size = radius * 2;
        let r = radius as f32;

        let len = (size as usize)
            .checked_mul(size as usize)
            .unwrap_or(0);
        let mut coverage = Vec::with_capacity(len);
        for py in 0..size {
            for px in 0..size {
                let dx = px as f32 + 0.5 - r;
                let dy = py as f32 + 0.5 - r;
                let distance = (dx * dx + dy * dy).sqrt() / r;
                coverage.push(falloff(distance, hardness));
            }
        }

        Self {
            radius,
            hardness,
            size,
            coverage,
        }
    }

    /// Coverage at mask pixel (x, y), 0 outside the mask
    #[inline]
    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        if x >= self.size || y >= self.size {
            return 0.0;
        }
        self.coverage[y as usize * self.size as usize + x as usize]
    }

    pub fn coverage_data(&self) -> &[f32] {
        &self.coverage
    }
}

/// Coverage at a normalized distance from the centre (0 at centre, 1 at rim)
#[inline]
pub fn falloff(distance_normalized: f32, hardness: f32) -> f32 {
    if distance_normalized >= 1.0 {
        return 0.0;
    }
    if distance_normalized <= hardness {
        return 1.0;
    }
    // hardness < distance < 1 here, so the span is positive
    (1.0 - distance_normalized) / (1.0 - hardness)
}

/// Memoizes brush tips by (radius, hardness)
///
/// Never evicts: radii are integers and hardness comes from a small fixed set.
#[derive(Debug, Default)]
pub struct BrushTipCache {
    tips: HashMap<(u32, u8), Arc<BrushTip>>,
}

impl BrushTipCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the tip for (radius, hardness), rendering it on first use
    pub fn get(&mut self, radius: u32, hardness: f32) -> Arc<BrushTip> {
        let key = (radius.clamp(1, MAX_TIP_RADIUS), quantize_hardness(hardness));
        self.tips
            .entry(key)
            .or_insert_with(|| {
                debug!(
                    "BrushTipCache: rendering tip radius={} hardness={:.2}",
                    key.0, hardness
                );
                Arc::new(BrushTip::render(key.0, key.1 as f32 / 255.0))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }
}

#[inline]
fn quantize_hardness(hardness: f32) -> u8 {
    (hardness.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falloff() {
        assert_eq!(falloff(0.0, 0.5), 1.0);
        assert_eq!(falloff(0.5, 0.5), 1.0);
        assert!((falloff(0.75, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(falloff(1.0, 0.5), 0.0);

        // fully soft fades linearly from the centre
        assert!((falloff(0.25, 0.0) - 0.75).abs() < 1e-6);
        // fully hard is a disc
        assert_eq!(falloff(0.99, 1.0), 1.0);
        assert_eq!(falloff(1.0, 1.0), 0.0);
    }

    #[test]
    fn test_render_tip() {
        let tip = BrushTip::render(8, 0.5);
        assert_eq!(tip.size, 16);
        assert_eq!(tip.coverage_data().len(), 256);
        // centre opaque, corner transparent
        assert_eq!(tip.coverage(8, 8), 1.0);
        assert_eq!(tip.coverage(0, 0), 0.0);
        assert_eq!(tip.coverage(99, 0), 0.0);
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(BrushTip::render(5, 0.3), BrushTip::render(5, 0.3));
    }

    #[test]
    fn test_zero_radius_renders_one_pixel_tip() {
        let tip = BrushTip::render(0, 1.0);
        assert_eq!(tip.radius, 1);
        assert_eq!(tip.size, 2);
    }

    #[test]
    fn test_oversized_radius_is_clamped() {
        let tip = BrushTip::render(40_000, 0.5);
        assert_eq!(tip.radius, MAX_TIP_RADIUS);
        assert_eq!(tip.size, MAX_TIP_RADIUS * 2);

        let mut cache = BrushTipCache::new();
        let a = cache.get(40_000, 0.5);
        let b = cache.get(u32::MAX, 0.5);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_reuses_tips() {
        let mut cache = BrushTipCache::new();
        let a = cache.get(6, 0.7);
        let b = cache.get(6, 0.7);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        cache.get(7, 0.7);
        cache.get(6, 0.2);
        assert_eq!(cache.len(), 3);
    }
}
