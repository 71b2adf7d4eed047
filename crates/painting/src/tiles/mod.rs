//! Authoritative tile mosaic with versioned patches and dirty tracking

mod decode;
mod dirty_tracking;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

use crate::constants::TILE_SIZE;

pub use decode::{TileError, decode_tile_base64, decode_tile_bytes};

/// Tile coordinates on the unbounded canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub tx: i32,
    pub ty: i32,
}

impl TileCoord {
    pub const fn new(tx: i32, ty: i32) -> Self {
        Self { tx, ty }
    }

    /// Tile containing a world-space point
    pub fn containing(x: f32, y: f32) -> Self {
        let size = TILE_SIZE as f32;
        Self {
            tx: (x / size).floor() as i32,
            ty: (y / size).floor() as i32,
        }
    }

    /// World-space position of the tile's top-left corner
    pub fn world_origin(self) -> (f32, f32) {
        let size = TILE_SIZE as f32;
        (self.tx as f32 * size, self.ty as f32 * size)
    }
}

/// One versioned tile. Version 0 with no image means "unknown".
#[derive(Debug, Clone)]
pub struct Tile {
    pub coord: TileCoord,
    pub version: u64,
    pub image: Option<Arc<RgbaImage>>,
}

/// Holds the authoritative tiles and applies patches under
/// highest-version-wins, ties keep the incumbent.
#[derive(Debug, Default)]
pub struct TileStore {
    tiles: HashMap<TileCoord, Tile>,
    pub(crate) dirty_tiles: HashSet<TileCoord>,
}

impl TileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode raster bytes and apply them as a patch.
    ///
    /// Returns `Ok(true)` if the tile was replaced, `Ok(false)` for a stale
    /// duplicate, and an error if neither decode path understood the bytes.
    /// A failed decode leaves the tile at its prior version.
    pub fn apply_patch(
        &mut self,
        coord: TileCoord,
        version: u64,
        raster: &[u8],
    ) -> Result<bool, TileError> {
        if self.is_stale(coord, version) {
            debug!(?coord, version, "TileStore::apply_patch: stale, skipping decode");
            return Ok(false);
        }
        let image = decode_tile_bytes(raster)?;
        Ok(self.apply_image(coord, version, image))
    }

    /// Apply an already-decoded patch. Returns whether the tile changed.
    pub fn apply_image(&mut self, coord: TileCoord, version: u64, image: RgbaImage) -> bool {
        if self.is_stale(coord, version) {
            debug!(
                ?coord,
                version,
                current = self.version(coord),
                "TileStore: ignoring stale patch"
            );
            return false;
        }

        if image.width() != TILE_SIZE || image.height() != TILE_SIZE {
            debug!(
                ?coord,
                "TileStore: patch is {}x{}, expected {}x{}",
                image.width(),
                image.height(),
                TILE_SIZE,
                TILE_SIZE
            );
        }

        self.tiles.insert(
            coord,
            Tile {
                coord,
                version,
                image: Some(Arc::new(image)),
            },
        );
        self.mark_dirty(coord);
        debug!(?coord, version, "TileStore: applied patch");
        true
    }

    /// Whether a patch at `version` would be rejected
    pub fn is_stale(&self, coord: TileCoord, version: u64) -> bool {
        self.tiles
            .get(&coord)
            .is_some_and(|current| version <= current.version)
    }

    /// Current version, 0 for unknown tiles
    pub fn version(&self, coord: TileCoord) -> u64 {
        self.tiles.get(&coord).map_or(0, |t| t.version)
    }

    pub fn get(&self, coord: TileCoord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Every held tile's version, for the join handshake
    pub fn known_versions(&self) -> BTreeMap<TileCoord, u64> {
        self.tiles
            .values()
            .map(|tile| (tile.coord, tile.version))
            .collect()
    }
}
