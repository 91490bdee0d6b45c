use std::fmt::Debug;

use anyhow::{ensure, Result};

use crate::bounding_box::GeoBoundingBox;
use crate::projection::{self, MAX_ZOOM};

/// Side length of a standard slippy-map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// An OSM slippy-map tile with x, y and zoom coordinate.
/// ref: https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TileIndex {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileIndex {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        assert!(zoom <= MAX_ZOOM);

        Self { x, y, zoom }
    }

    /// File name this tile is cached under.
    pub fn file_name(&self) -> String {
        format!("tile_{}_{}_{}.png", self.zoom, self.x, self.y)
    }
}

/// A rectangular range of tiles at one zoom level, both bounds inclusive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TileRange {
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
    pub zoom: u8,
}

impl TileRange {
    pub fn new(x_min: u32, x_max: u32, y_min: u32, y_max: u32, zoom: u8) -> Result<Self> {
        ensure!(zoom <= MAX_ZOOM, "zoom {zoom} exceeds the maximum of {MAX_ZOOM}");
        ensure!(x_min <= x_max, "x_min ({x_min}) must be <= x_max ({x_max})");
        ensure!(y_min <= y_max, "y_min ({y_min}) must be <= y_max ({y_max})");

        let side = 1_u64 << zoom;
        ensure!(
            u64::from(x_max) < side && u64::from(y_max) < side,
            "tile indices {x_max}x{y_max} out of range at zoom {zoom}",
        );

        Ok(TileRange {
            x_min,
            x_max,
            y_min,
            y_max,
            zoom,
        })
    }

    /// The covering range for `bbox` at `zoom`.
    pub fn from_bbox(bbox: &GeoBoundingBox, zoom: u8) -> Result<Self> {
        // y grows southward, so the minimum corner carries the maximum y
        let sw = projection::deg_to_tile(bbox.min_lat, bbox.min_lon, zoom);
        let ne = projection::deg_to_tile(bbox.max_lat, bbox.max_lon, zoom);

        Self::new(sw.x, ne.x, ne.y, sw.y, zoom)
    }

    /// Number of tile columns covered.
    pub fn cols(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    /// Number of tile rows covered.
    pub fn rows(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    /// Total number of tiles covered.
    pub fn count(&self) -> usize {
        self.cols() as usize * self.rows() as usize
    }

    /// Creates an iterator iterating over all tiles in the range, x-major.
    pub fn tiles(&self) -> impl Iterator<Item = TileIndex> + Debug {
        let TileRange {
            x_min,
            x_max,
            y_min,
            y_max,
            zoom,
        } = *self;

        (x_min..=x_max)
            .flat_map(move |x| (y_min..=y_max).map(move |y| TileIndex::new(x, y, zoom)))
    }
}
