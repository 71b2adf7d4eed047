//! Redraws the authoritative mosaic into a base surface

use tracing::debug;

use crate::constants::TILE_SIZE;
use crate::surface::CpuSurface;
use crate::tiles::TileStore;
use crate::types::Point;
use crate::view::ViewTransform;

/// Base-layer renderer fed by the tile store
///
/// Drawn independently of the echo layer. Any dirty tile triggers a full
/// repaint of the visible mosaic.
#[derive(Debug)]
pub struct Compositor {
    surface: CpuSurface,
    needs_full_redraw: bool,
}

impl Compositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: CpuSurface::new(width, height),
            needs_full_redraw: true,
        }
    }

    pub fn surface(&self) -> &CpuSurface {
        &self.surface
    }

    /// Force a repaint on the next `redraw`, e.g. after a pan or zoom
    pub fn invalidate(&mut self) {
        self.needs_full_redraw = true;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
        self.needs_full_redraw = true;
    }

    /// Whether a redraw would do anything
    pub fn is_pending(&self, tiles: &TileStore) -> bool {
        self.needs_full_redraw || tiles.has_dirty_tiles()
    }

    /// Repaint if tiles changed. Returns the number of tiles drawn, or
    /// `None` if nothing was pending.
    pub fn redraw(&mut self, tiles: &mut TileStore, view: &ViewTransform) -> Option<usize> {
        if !self.is_pending(tiles) {
            return None;
        }
        let dirty = tiles.take_dirty_tiles();
        self.needs_full_redraw = false;
        self.surface.clear([0.0; 4]);

        let mut drawn = 0;
        for tile in tiles.iter() {
            let Some(image) = tile.image.as_ref() else {
                continue;
            };
            let (wx, wy) = tile.coord.world_origin();
            let top_left = view.world_to_screen(Point::new(wx, wy));
            let extent = TILE_SIZE as f32 * view.scale;

            let x0 = top_left.x.floor().max(0.0) as i64;
            let y0 = top_left.y.floor().max(0.0) as i64;
            let x1 = ((top_left.x + extent).ceil() as i64).min(self.surface.width as i64);
            let y1 = ((top_left.y + extent).ceil() as i64).min(self.surface.height as i64);
            if x0 >= x1 || y0 >= y1 {
                continue;
            }

            let sx = image.width() as f32 / TILE_SIZE as f32;
            let sy = image.height() as f32 / TILE_SIZE as f32;
            for py in y0..y1 {
                for px in x0..x1 {
                    let world = view.screen_to_world(Point::new(px as f32 + 0.5, py as f32 + 0.5));
                    let u = ((world.x - wx) * sx).floor();
                    let v = ((world.y - wy) * sy).floor();
                    if u < 0.0 || v < 0.0 || u >= image.width() as f32 || v >= image.height() as f32 {
                        continue;
                    }
                    let texel = image.get_pixel(u as u32, v as u32).0;
                    self.surface
                        .set_pixel(px, py, texel.map(|c| c as f32 / 255.0));
                }
            }
            drawn += 1;
        }

        debug!(
            "Compositor::redraw: {} dirty, {} tiles drawn",
            dirty.len(),
            drawn
        );
        Some(drawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::TileCoord;
    use image::{Rgba, RgbaImage};

    fn solid(r: u8) -> RgbaImage {
        RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([r, 0, 0, 255]))
    }

    #[test]
    fn test_redraw_only_when_pending() {
        let mut tiles = TileStore::new();
        let mut compositor = Compositor::new(64, 64);
        let view = ViewTransform::default();

        assert_eq!(compositor.redraw(&mut tiles, &view), Some(0));
        assert_eq!(compositor.redraw(&mut tiles, &view), None);

        tiles.apply_image(TileCoord::new(0, 0), 1, solid(255));
        assert_eq!(compositor.redraw(&mut tiles, &view), Some(1));
        assert_eq!(compositor.surface().get_pixel(10, 10).unwrap(), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_tiles_placed_through_view() {
        let mut tiles = TileStore::new();
        tiles.apply_image(TileCoord::new(1, 0), 1, solid(255));
        let mut compositor = Compositor::new(64, 64);

        // tile (1, 0) starts at world x=256, which is screen x=32 at scale 0.125
        let view = ViewTransform::new(0.0, 0.0, 0.125);
        compositor.redraw(&mut tiles, &view);
        assert_eq!(compositor.surface().get_pixel(31, 5).unwrap()[3], 0.0);
        assert_eq!(compositor.surface().get_pixel(32, 5).unwrap()[3], 1.0);
        assert_eq!(compositor.surface().get_pixel(63, 31).unwrap()[3], 1.0);
        assert_eq!(compositor.surface().get_pixel(40, 33).unwrap()[3], 0.0);
    }

    #[test]
    fn test_invalidate_and_resize() {
        let mut tiles = TileStore::new();
        let mut compositor = Compositor::new(8, 8);
        let view = ViewTransform::default();
        compositor.redraw(&mut tiles, &view);

        compositor.invalidate();
        assert!(compositor.is_pending(&tiles));
        compositor.redraw(&mut tiles, &view);

        compositor.resize(16, 4);
        assert!(compositor.is_pending(&tiles));
        assert_eq!(compositor.surface().width, 16);
    }
}
