//! Plot OpenStreetMap ways and nodes over stitched map tiles.
//!
//! Resolves OSM element ids to geometry through a Nominatim-style lookup
//! service, computes the slippy-map tile range covering the resolved
//! coordinates, downloads the raster tiles (into a permanent on-disk cache),
//! stitches them into a single supertile and writes an SVG figure with the
//! vector features drawn on top.
//!
//! **Use with care.** Downloading tiles en-masse can hog down a tile server
//! easily; the per-run tile ceiling exists for a reason.
//!
//! # CLI Example
//!
//! ```bash
//! osm-overlay drive.json --zoom 17 --rate 5 -v
//! ```
//!
//! # Library Example
//! ```no_run
//! use std::path::Path;
//! use osm_overlay::{Config, DrawSpec, GeoBoundingBox, LookupClient, TileRange};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let cfg = Config::default();
//! let spec = DrawSpec::from_path(Path::new("drive.json"))?;
//!
//! let lookup = LookupClient::new(&cfg.lookup_url, cfg.timeout)?;
//! let data = lookup.resolve_batch(&spec.ways, &spec.nodes).await;
//!
//! let bbox = GeoBoundingBox::from_coords(&data.way_coords)?;
//! let zoom = cfg.zoom.unwrap_or_else(|| osm_overlay::zoom_level(&bbox));
//! let range = TileRange::from_bbox(&bbox, zoom)?;
//!
//! osm_overlay::fetch_tiles(&cfg, &range).await?;
//! let supertile = osm_overlay::assemble(&range, &cfg.tile_folder)?;
//! let svg = osm_overlay::render_svg(&supertile, &range, &data, &spec, cfg.aspect_lat_deg)?;
//! osm_overlay::write_figure(&cfg.fig_folder, "drive", &svg)?;
//! # Ok(())
//! # }
//! ```

mod bounding_box;
mod config;
mod fetch;
mod lookup;
mod manifest;
mod projection;
mod render;
mod supertile;
mod tile;
mod url;

pub use bounding_box::GeoBoundingBox;
pub use config::{Config, DEFAULT_LOOKUP_URL};
pub use fetch::{fetch_tile, fetch_tiles, FetchReport, TileStatus};
pub use lookup::{ElementKind, FeatureGeometry, LookupClient, MapData};
pub use manifest::DrawSpec;
pub use projection::{
    deg_to_global_xy, deg_to_tile, semicircle_to_deg, tile_to_deg, zoom_level, MAX_ZOOM,
};
pub use render::{render_svg, write_figure};
pub use supertile::assemble;
pub use tile::{TileIndex, TileRange, TILE_SIZE};
pub use url::{UrlFormat, DEFAULT_TILE_URL};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic]
    fn bbox_panics_on_flipped_axis() {
        GeoBoundingBox::new(13.5, 13.3, 52.5, 52.6);
    }

    #[test]
    #[should_panic]
    fn bbox_panics_out_of_range() {
        GeoBoundingBox::new(0.0, 360.0, 0.0, 0.0);
    }

    #[test]
    fn tile_index() {
        let tile = deg_to_tile(50.7929, 6.0402, 18);
        assert_eq!((tile.x, tile.y), (135470, 87999));
    }

    #[test]
    fn zoom_estimation_feeds_a_valid_range() {
        let bbox = GeoBoundingBox::new(13.3, 13.5, 52.5, 52.6);
        let zoom = zoom_level(&bbox);
        let range = TileRange::from_bbox(&bbox, zoom).unwrap();

        assert!(range.count() >= 1);
        assert!(range.count() <= Config::default().max_tile_count);
    }
}
