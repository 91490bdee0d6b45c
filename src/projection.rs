use std::f64::consts::PI;

use crate::bounding_box::GeoBoundingBox;
use crate::tile::TileIndex;

/// Highest zoom level served by the standard OSM tile layers.
pub const MAX_ZOOM: u8 = 18;

/// Empirically tuned normalization of the Mercator map width used by the
/// zoom estimator.
const MERCATOR_SPAN: f64 = 170.1023;

/// Estimate the zoom level at which `bbox` fits typical tile coverage.
///
/// The latitude span is compared against the full 360° turn and the
/// longitude span against [`MERCATOR_SPAN`]; the smaller of the two
/// candidate levels plus a one-level safety margin wins. The result is
/// clamped to `[0, 18]`, so degenerate (zero-span) boxes saturate at the
/// maximum zoom.
pub fn zoom_level(bbox: &GeoBoundingBox) -> u8 {
    let z_lat = (360.0 / bbox.lat_span()).log2().ceil();
    let z_lon = (MERCATOR_SPAN / bbox.lon_span()).log2().ceil();

    (z_lat.min(z_lon) + 1.0).clamp(0.0, MAX_ZOOM as f64) as u8
}

/// Project `(lat, lon)` in degrees onto the global slippy-map XY plane at
/// `zoom`, where one unit is one tile.
/// ref: https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames
///
/// Undefined at the poles: `|lat| = 90°` yields meaningless output far off
/// the tile grid.
pub fn deg_to_global_xy(lat_deg: f64, lon_deg: f64, zoom: u8) -> (f64, f64) {
    let lat_rad = lat_deg.to_radians();

    // scale factor
    let n = 2_f64.powi(zoom as i32);

    let x = (lon_deg + 180_f64) / 360_f64 * n;
    let y = (1_f64 - lat_rad.tan().asinh() / PI) / 2_f64 * n;

    (x, y)
}

/// The tile containing `(lat, lon)` at `zoom`.
pub fn deg_to_tile(lat_deg: f64, lon_deg: f64, zoom: u8) -> TileIndex {
    let (x, y) = deg_to_global_xy(lat_deg, lon_deg, zoom);

    TileIndex::new(x as u32, y as u32, zoom)
}

/// Inverse projection: `(lat, lon)` in degrees of the NW corner of tile
/// `(x, y)` at `zoom`. Callers needing the SE corner pass `x + 1` / `y + 1`.
pub fn tile_to_deg(x: u32, y: u32, zoom: u8) -> (f64, f64) {
    let n = 2_f64.powi(zoom as i32);

    let lon_deg = x as f64 / n * 360_f64 - 180_f64;
    let lat_rad = (PI * (1_f64 - 2_f64 * y as f64 / n)).sinh().atan();

    (lat_rad.to_degrees(), lon_deg)
}

/// Convert a fixed-point semicircle angle (the unit some GPS device formats
/// record positions in) to degrees.
pub fn semicircle_to_deg(semicircles: i32) -> f64 {
    semicircles as f64 * 180_f64 / 2_f64.powi(31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_level_berlin() {
        let bbox = GeoBoundingBox::new(13.3, 13.5, 52.5, 52.6);
        assert_eq!(zoom_level(&bbox), 11);
    }

    #[test]
    fn zoom_level_non_increasing_in_span() {
        let mut previous = MAX_ZOOM;

        for scale in [1_f64, 2.0, 4.0, 8.0, 16.0] {
            let bbox =
                GeoBoundingBox::new(13.3, 13.3 + 0.2 * scale, 52.5, 52.5 + 0.1 * scale);
            let zoom = zoom_level(&bbox);

            assert!(zoom <= previous);
            assert!(zoom <= MAX_ZOOM);
            previous = zoom;
        }
    }

    #[test]
    fn zoom_level_clamps_whole_world() {
        let bbox = GeoBoundingBox::new(-180.0, 180.0, -85.0, 85.0);
        assert_eq!(zoom_level(&bbox), 0);
    }

    #[test]
    fn zoom_level_clamps_degenerate_box() {
        let bbox = GeoBoundingBox::new(13.4, 13.4, 52.5, 52.5);
        assert_eq!(zoom_level(&bbox), MAX_ZOOM);
    }

    #[test]
    fn berlin_tile_index() {
        let tile = deg_to_tile(52.52, 13.405, 17);
        assert_eq!((tile.x, tile.y), (70416, 42985));
    }

    #[test]
    fn global_xy_stays_on_the_map_off_the_poles() {
        let (x, y) = deg_to_global_xy(85.0, 179.9, 3);

        assert!((0.0..8.0).contains(&x));
        assert!((0.0..8.0).contains(&y));
    }

    #[test]
    fn tile_to_deg_nw_corner_of_origin() {
        let (lat, lon) = tile_to_deg(0, 0, 0);
        assert_eq!(lon, -180.0);
        assert!((lat - 85.0511).abs() < 1e-3);
    }

    #[test]
    fn round_trip_stays_within_one_tile() {
        let samples = [
            (52.52, 13.405, 17),
            (0.0, 0.0, 5),
            (-33.9, 151.2, 10),
            (50.7929, 6.0402, 18),
        ];

        for (lat, lon, zoom) in samples {
            let tile = deg_to_tile(lat, lon, zoom);
            let (lat_nw, lon_nw) = tile_to_deg(tile.x, tile.y, zoom);
            let (lat_se, lon_se) = tile_to_deg(tile.x + 1, tile.y + 1, zoom);

            assert!(lon_nw <= lon && lon < lon_se);
            assert!(lat_se < lat && lat <= lat_nw);
        }
    }

    #[test]
    fn semicircles() {
        assert_eq!(semicircle_to_deg(0), 0.0);
        assert_eq!(semicircle_to_deg(1 << 30), 90.0);
        assert_eq!(semicircle_to_deg(-(1 << 30)), -90.0);
    }
}
