//! Local echo: immediate, unconfirmed rendering of dabs
//!
//! Strokes painted here are predictions. The layer can be wiped at any time
//! without touching the tile store; authoritative tiles repaint anything real.

use tracing::debug;

use crate::constants::{DEFAULT_HARDNESS, FLOW, MAX_TIP_RADIUS};
use crate::surface::{CpuSurface, Rgba};
use crate::tip::BrushTipCache;
use crate::types::{Dab, ToolMode};
use crate::view::ViewTransform;

/// Paints dabs onto a transient prediction surface
#[derive(Debug)]
pub struct LocalEchoRenderer {
    surface: CpuSurface,
    tips: BrushTipCache,
    ink: Rgba,
    hardness: f32,
    flow: f32,
}

impl LocalEchoRenderer {
    /// Create a renderer with a transparent surface of the given screen size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: CpuSurface::new(width, height),
            tips: BrushTipCache::new(),
            ink: [0.0, 0.0, 0.0, 1.0],
            hardness: DEFAULT_HARDNESS,
            flow: FLOW,
        }
    }

    pub fn set_ink(&mut self, ink: Rgba) {
        self.ink = ink;
    }

    pub fn set_hardness(&mut self, hardness: f32) {
        self.hardness = hardness.clamp(0.0, 1.0);
    }

    pub fn surface(&self) -> &CpuSurface {
        &self.surface
    }

    pub fn tip_cache(&self) -> &BrushTipCache {
        &self.tips
    }

    /// Composite dabs through the view. Returns how many landed on screen.
    pub fn paint(&mut self, dabs: &[Dab], tool: ToolMode, view: &ViewTransform) -> usize {
        let mut painted = 0;
        for dab in dabs {
            if self.paint_dab(dab, tool, view) {
                painted += 1;
            }
        }
        if painted > 0 {
            debug!(
                "LocalEchoRenderer::paint: {}/{} dabs, mode={:?}",
                painted,
                dabs.len(),
                tool
            );
        }
        painted
    }

    fn paint_dab(&mut self, dab: &Dab, tool: ToolMode, view: &ViewTransform) -> bool {
        let centre = view.world_to_screen(dab.position());
        let screen_radius = (dab.radius * view.scale).round().max(1.0);
        if !screen_radius.is_finite() || screen_radius > MAX_TIP_RADIUS as f32 {
            debug!(
                "LocalEchoRenderer::paint: skipping dab with screen radius {}",
                screen_radius
            );
            return false;
        }
        if !centre.x.is_finite() || !centre.y.is_finite() {
            return false;
        }
        let radius = screen_radius as u32;
        let alpha = (self.flow * dab.weight).min(1.0);

        let left = centre.x.round() as i64 - radius as i64;
        let top = centre.y.round() as i64 - radius as i64;
        let span = (radius * 2) as i64;
        if left + span <= 0
            || top + span <= 0
            || left >= self.surface.width as i64
            || top >= self.surface.height as i64
        {
            return false;
        }

        let tip = self.tips.get(radius, self.hardness);
        for my in 0..tip.size {
            for mx in 0..tip.size {
                let coverage = tip.coverage(mx, my);
                if coverage <= 0.0 {
                    continue;
                }
                self.surface.composite_pixel(
                    left + mx as i64,
                    top + my as i64,
                    self.ink,
                    coverage * alpha,
                    tool,
                );
            }
        }
        true
    }

    /// Wipe all predictions
    pub fn clear(&mut self) {
        self.surface.clear([0.0; 4]);
    }

    /// The presenting surface changed size; predictions are dropped
    pub fn reset_surface(&mut self, width: u32, height: u32) {
        debug!("LocalEchoRenderer::reset_surface: {}x{}", width, height);
        self.surface.resize(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_marks_surface() {
        let mut echo = LocalEchoRenderer::new(64, 64);
        let view = ViewTransform::default();
        let painted = echo.paint(&[Dab::new(32.0, 32.0, 5.0, 1.0)], ToolMode::Normal, &view);

        assert_eq!(painted, 1);
        let centre = echo.surface().get_pixel(32, 32).unwrap();
        assert!((centre[3] - FLOW).abs() < 1e-4);
        assert_eq!(echo.surface().get_pixel(0, 0).unwrap()[3], 0.0);
    }

    #[test]
    fn test_overlapping_dabs_build_up() {
        let mut echo = LocalEchoRenderer::new(64, 64);
        let view = ViewTransform::default();
        let dab = Dab::new(32.0, 32.0, 5.0, 1.0);
        echo.paint(&[dab], ToolMode::Normal, &view);
        let once = echo.surface().get_pixel(32, 32).unwrap()[3];
        echo.paint(&[dab], ToolMode::Normal, &view);
        let twice = echo.surface().get_pixel(32, 32).unwrap()[3];
        assert!(twice > once);
        assert!(twice < 1.0);
    }

    #[test]
    fn test_erase_removes_paint() {
        let mut echo = LocalEchoRenderer::new(64, 64);
        let view = ViewTransform::default();
        let dab = Dab::new(32.0, 32.0, 5.0, 1.0);
        for _ in 0..4 {
            echo.paint(&[dab], ToolMode::Normal, &view);
        }
        let painted = echo.surface().get_pixel(32, 32).unwrap()[3];
        echo.paint(&[dab], ToolMode::Erase, &view);
        let erased = echo.surface().get_pixel(32, 32).unwrap()[3];
        assert!(erased < painted);
    }

    #[test]
    fn test_unknown_wire_tool_paints_normally() {
        let mut echo = LocalEchoRenderer::new(32, 32);
        let view = ViewTransform::default();
        echo.paint(&[Dab::new(16.0, 16.0, 4.0, 1.0)], ToolMode::from_wire(42), &view);
        assert!(echo.surface().get_pixel(16, 16).unwrap()[3] > 0.0);
    }

    #[test]
    fn test_view_scale_applies() {
        let mut echo = LocalEchoRenderer::new(128, 128);
        let view = ViewTransform::new(0.0, 0.0, 4.0);
        echo.paint(&[Dab::new(16.0, 16.0, 2.0, 1.0)], ToolMode::Normal, &view);
        // radius 2 at 4x lands at (64, 64) with radius 8
        assert!(echo.surface().get_pixel(64, 64).unwrap()[3] > 0.0);
        assert!(echo.surface().get_pixel(70, 64).unwrap()[3] > 0.0);
        assert_eq!(echo.surface().get_pixel(80, 64).unwrap()[3], 0.0);
        assert_eq!(echo.tip_cache().len(), 1);
    }

    #[test]
    fn test_oversized_dab_skipped() {
        let mut echo = LocalEchoRenderer::new(64, 64);
        let view = ViewTransform::default();
        let dabs = [
            Dab::new(10.0, 10.0, 40_000.0, 1.0),
            Dab::new(10.0, 10.0, f32::MAX, 1.0),
        ];
        assert_eq!(echo.paint(&dabs, ToolMode::Normal, &view), 0);
        assert!(echo.surface().is_blank());
        assert!(echo.tip_cache().is_empty());

        // Within the limit at 1x, beyond it once zoomed in
        let zoomed = ViewTransform::new(0.0, 0.0, 8.0);
        let dab = Dab::new(4.0, 4.0, 100.0, 1.0);
        assert_eq!(echo.paint(&[dab], ToolMode::Normal, &view), 1);
        assert_eq!(echo.paint(&[dab], ToolMode::Normal, &zoomed), 0);
    }

    #[test]
    fn test_offscreen_dab_skipped() {
        let mut echo = LocalEchoRenderer::new(16, 16);
        let view = ViewTransform::default();
        assert_eq!(echo.paint(&[Dab::new(-100.0, 5.0, 3.0, 1.0)], ToolMode::Normal, &view), 0);
        assert!(echo.tip_cache().is_empty());
    }

    #[test]
    fn test_clear_and_reset() {
        let mut echo = LocalEchoRenderer::new(32, 32);
        let view = ViewTransform::default();
        echo.paint(&[Dab::new(16.0, 16.0, 4.0, 1.0)], ToolMode::Normal, &view);
        echo.clear();
        assert!(echo.surface().is_blank());

        echo.paint(&[Dab::new(16.0, 16.0, 4.0, 1.0)], ToolMode::Normal, &view);
        echo.reset_surface(48, 24);
        assert!(echo.surface().is_blank());
        assert_eq!(echo.surface().width, 48);
    }
}
