//! Dirty tile tracking for incremental redraw

use tracing::debug;

use super::{TileCoord, TileStore};

impl TileStore {
    /// Mark a tile as needing redraw
    #[inline]
    pub fn mark_dirty(&mut self, coord: TileCoord) {
        self.dirty_tiles.insert(coord);
    }

    /// Mark every held tile dirty, e.g. after the view moved
    pub fn mark_all_dirty(&mut self) {
        let before = self.dirty_tiles.len();
        let coords: Vec<TileCoord> = self.iter().map(|t| t.coord).collect();
        self.dirty_tiles.extend(coords);
        debug!(
            "mark_all_dirty: {} new tiles (total {})",
            self.dirty_tiles.len() - before,
            self.dirty_tiles.len()
        );
    }

    /// Get all dirty tiles and clear the dirty set
    pub fn take_dirty_tiles(&mut self) -> Vec<TileCoord> {
        let mut tiles: Vec<TileCoord> = self.dirty_tiles.drain().collect();
        tiles.sort_unstable();
        tiles
    }

    #[inline]
    pub fn has_dirty_tiles(&self) -> bool {
        !self.dirty_tiles.is_empty()
    }

    #[inline]
    pub fn dirty_tile_count(&self) -> usize {
        self.dirty_tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_mark_all_dirty() {
        let mut store = TileStore::new();
        store.apply_image(TileCoord::new(0, 0), 1, RgbaImage::new(1, 1));
        store.apply_image(TileCoord::new(0, 1), 1, RgbaImage::new(1, 1));
        store.take_dirty_tiles();

        store.mark_all_dirty();
        assert_eq!(store.dirty_tile_count(), 2);
        assert_eq!(
            store.take_dirty_tiles(),
            vec![TileCoord::new(0, 0), TileCoord::new(0, 1)]
        );
    }
}
