use std::fmt::Write as _;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine as _;
use image::{ImageFormat, RgbImage};
use tracing::debug;

use crate::lookup::MapData;
use crate::manifest::DrawSpec;
use crate::projection;
use crate::tile::TileRange;

/// Marker colors per feature class reported by the lookup service.
const WAY_STYLES: &[(&str, &str)] = &[("motorway", "blue"), ("motorway_link", "green")];

/// Highlighted way vertices and free-standing nodes share this color.
const HIGHLIGHT_COLOR: &str = "yellow";

/// Way marker radius in canvas units; highlights and nodes use half of it.
const MARKER_SIZE: f64 = 2.0;

/// Geographic extents of a stitched tile range, the figure's axes.
struct Extent {
    lon_min: f64,
    lon_max: f64,
    lat_min: f64,
    lat_max: f64,
}

impl Extent {
    /// Outer corners of the range: NW corner of the minimum tile and SE
    /// corner of the maximum one, hence the +1 on the far indices.
    fn of_range(range: &TileRange) -> Self {
        let (lat_min, lon_min) =
            projection::tile_to_deg(range.x_min, range.y_max + 1, range.zoom);
        let (lat_max, lon_max) =
            projection::tile_to_deg(range.x_max + 1, range.y_min, range.zoom);

        Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        }
    }
}

/// Render the supertile and the feature overlays into an SVG document.
///
/// The raster is embedded as a base64 data URI and stretched vertically by
/// `1 / cos(aspect_lat_deg)`, the fixed aspect correction the figure uses in
/// place of a per-map mean latitude. Overlay coordinates are placed linearly
/// within the extents derived from the range's outer corners.
pub fn render_svg(
    supertile: &RgbImage,
    range: &TileRange,
    data: &MapData,
    spec: &DrawSpec,
    aspect_lat_deg: f64,
) -> Result<String> {
    let extent = Extent::of_range(range);
    let aspect = 1.0 / aspect_lat_deg.to_radians().cos();

    let width = supertile.width() as f64;
    let height = supertile.height() as f64 * aspect;

    let place = |lon: f64, lat: f64| {
        let x = (lon - extent.lon_min) / (extent.lon_max - extent.lon_min) * width;
        let y = (extent.lat_max - lat) / (extent.lat_max - extent.lat_min) * height;
        (x, y)
    };

    let mut svg = String::new();
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.0} {height:.0}">"#,
    )?;
    writeln!(
        svg,
        r#"  <image x="0" y="0" width="{width:.0}" height="{height:.0}" preserveAspectRatio="none" href="data:image/png;base64,{}"/>"#,
        encode_png(supertile)?,
    )?;

    for (id, geometry) in &data.ways {
        let Some(color) = way_color(&geometry.kind) else {
            debug!(id, kind = %geometry.kind, "no style for way class, skipping");
            continue;
        };

        for (lon, lat) in geometry.coords() {
            let (cx, cy) = place(lon, lat);
            writeln!(
                svg,
                r#"  <circle cx="{cx:.2}" cy="{cy:.2}" r="{MARKER_SIZE}" fill="{color}"/>"#,
            )?;
        }
    }

    for (way_id, index) in spec.highlights() {
        let Some((lon, lat)) = data.way(way_id).and_then(|g| g.coord_at(index)) else {
            debug!(way_id, index, "highlight selector matches no vertex");
            continue;
        };

        let (cx, cy) = place(lon, lat);
        writeln!(
            svg,
            r#"  <circle cx="{cx:.2}" cy="{cy:.2}" r="{}" fill="{HIGHLIGHT_COLOR}"/>"#,
            MARKER_SIZE / 2.0,
        )?;
    }

    for (_, geometry) in &data.nodes {
        for (lon, lat) in geometry.coords() {
            let (cx, cy) = place(lon, lat);
            writeln!(
                svg,
                r#"  <circle cx="{cx:.2}" cy="{cy:.2}" r="{}" fill="{HIGHLIGHT_COLOR}"/>"#,
                MARKER_SIZE / 2.0,
            )?;
        }
    }

    svg.push_str("</svg>\n");

    Ok(svg)
}

/// Write `svg` to `{fig_folder}/{stem}.svg`, creating the folder if needed.
pub fn write_figure(fig_folder: &Path, stem: &str, svg: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(fig_folder)
        .with_context(|| format!("failed creating figure directory {}", fig_folder.display()))?;

    let path = fig_folder.join(format!("{stem}.svg"));
    std::fs::write(&path, svg)
        .with_context(|| format!("failed writing figure {}", path.display()))?;

    Ok(path)
}

fn way_color(kind: &str) -> Option<&'static str> {
    WAY_STYLES
        .iter()
        .find(|(class, _)| *class == kind)
        .map(|(_, color)| *color)
}

fn encode_png(img: &RgbImage) -> Result<String> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .context("failed encoding supertile PNG")?;

    Ok(base64::engine::general_purpose::STANDARD.encode(buf.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::lookup::FeatureGeometry;
    use crate::tile::TILE_SIZE;

    fn way(kind: &str, coords: serde_json::Value) -> FeatureGeometry {
        FeatureGeometry {
            kind: kind.to_owned(),
            geojson: json!({"type": "LineString", "coordinates": coords}),
        }
    }

    #[test]
    fn canvas_carries_the_aspect_correction() {
        let range = TileRange::new(0, 0, 0, 0, 1).unwrap();
        let supertile = RgbImage::new(TILE_SIZE, TILE_SIZE);

        // 1 / cos(60°) = 2
        let svg = render_svg(
            &supertile,
            &range,
            &MapData::default(),
            &DrawSpec::default(),
            60.0,
        )
        .unwrap();

        assert!(svg.starts_with("<svg "));
        assert!(svg.contains(r#"width="256" height="512""#));
        assert!(svg.contains("data:image/png;base64,"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn way_classes_get_their_colors_unknown_classes_are_skipped() {
        let range = TileRange::new(0, 0, 0, 0, 1).unwrap();
        let supertile = RgbImage::new(TILE_SIZE, TILE_SIZE);

        let mut data = MapData::default();
        data.ways.push((1, way("motorway", json!([[-90.0, 40.0], [-89.0, 41.0]]))));
        data.ways.push((2, way("motorway_link", json!([[-88.0, 42.0]]))));
        data.ways.push((3, way("residential", json!([[-87.0, 43.0]]))));

        let svg =
            render_svg(&supertile, &range, &data, &DrawSpec::default(), 60.0).unwrap();

        assert_eq!(svg.matches(r#"fill="blue""#).count(), 2);
        assert_eq!(svg.matches(r#"fill="green""#).count(), 1);
        assert_eq!(svg.matches("<circle").count(), 3);
    }

    #[test]
    fn highlights_and_nodes_use_the_highlight_color() {
        let range = TileRange::new(0, 0, 0, 0, 1).unwrap();
        let supertile = RgbImage::new(TILE_SIZE, TILE_SIZE);

        let mut data = MapData::default();
        data.ways.push((9, way("motorway", json!([[-90.0, 40.0], [-89.0, 41.0]]))));
        data.nodes.push((
            5,
            FeatureGeometry {
                kind: "bus_stop".to_owned(),
                geojson: json!({"type": "Point", "coordinates": [-85.0, 30.0]}),
            },
        ));

        let spec: DrawSpec =
            serde_json::from_str(r#"{"highlight_way_nodes": {"9": 1, "9999": 0}}"#).unwrap();

        let svg = render_svg(&supertile, &range, &data, &spec, 60.0).unwrap();

        // one highlighted vertex + one node; the unresolvable selector is skipped
        assert_eq!(svg.matches(r#"fill="yellow""#).count(), 2);
        assert_eq!(svg.matches(r#"r="1""#).count(), 2);
    }

    #[test]
    fn write_figure_creates_the_folder() {
        let dir = tempfile::tempdir().unwrap();
        let fig_folder = dir.path().join("figs");

        let path = write_figure(&fig_folder, "drive", "<svg></svg>").unwrap();

        assert_eq!(path, fig_folder.join("drive.svg"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<svg></svg>");
    }
}
