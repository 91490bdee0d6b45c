use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::fetch::USER_AGENT;

/// OSM element kinds understood by the lookup endpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ElementKind {
    Way,
    Node,
    Relation,
}

impl ElementKind {
    /// Single-letter discriminator used in `osm_ids` query values.
    fn letter(self) -> char {
        match self {
            ElementKind::Way => 'W',
            ElementKind::Node => 'N',
            ElementKind::Relation => 'R',
        }
    }
}

/// Geometry of one resolved OSM element.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureGeometry {
    /// Feature class reported by the lookup service, e.g. "motorway".
    pub kind: String,
    /// Raw GeoJSON geometry of the element.
    pub geojson: Value,
}

impl Default for FeatureGeometry {
    fn default() -> Self {
        Self {
            kind: String::new(),
            geojson: Value::Object(Default::default()),
        }
    }
}

impl FeatureGeometry {
    /// All `(lon, lat)` pairs of the geometry: one for a Point, the vertex
    /// list of a LineString, every ring vertex of a Polygon.
    pub fn coords(&self) -> Vec<(f64, f64)> {
        let Some(geom_type) = self.geojson.get("type").and_then(Value::as_str) else {
            return Vec::new();
        };
        let Some(raw) = self.geojson.get("coordinates") else {
            return Vec::new();
        };

        match geom_type {
            "Point" => pair(raw).into_iter().collect(),
            "LineString" => pairs(raw),
            "Polygon" => raw
                .as_array()
                .map(|rings| rings.iter().flat_map(pairs).collect())
                .unwrap_or_default(),
            other => {
                debug!(geometry = other, "unsupported geometry type, no coordinates");
                Vec::new()
            }
        }
    }

    /// The coordinate at `index` of the geometry's vertex list.
    pub fn coord_at(&self, index: usize) -> Option<(f64, f64)> {
        self.coords().get(index).copied()
    }
}

fn pair(value: &Value) -> Option<(f64, f64)> {
    let arr = value.as_array()?;
    Some((arr.first()?.as_f64()?, arr.get(1)?.as_f64()?))
}

fn pairs(value: &Value) -> Vec<(f64, f64)> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(pair).collect())
        .unwrap_or_default()
}

/// Everything resolved for one manifest run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapData {
    /// Resolved ways in input order, duplicates preserved.
    pub ways: Vec<(u64, FeatureGeometry)>,
    /// Resolved nodes in input order.
    pub nodes: Vec<(u64, FeatureGeometry)>,
    /// Flattened way coordinates, for bounding-box computation.
    pub way_coords: Vec<(f64, f64)>,
    /// Flattened node coordinates.
    pub node_coords: Vec<(f64, f64)>,
}

impl MapData {
    /// First resolved geometry for the given way id.
    pub fn way(&self, id: u64) -> Option<&FeatureGeometry> {
        self.ways
            .iter()
            .find(|(way_id, _)| *way_id == id)
            .map(|(_, geometry)| geometry)
    }
}

/// Client for a Nominatim-style element lookup endpoint.
pub struct LookupClient {
    client: reqwest::Client,
    base_url: String,
}

impl LookupClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if timeout > Duration::ZERO {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .user_agent(USER_AGENT)
            .build()
            .context("failed creating HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Resolve one element id to its geometry.
    ///
    /// Transport failures and malformed bodies are not distinguished from an
    /// unknown id: every failure mode yields the empty default geometry so a
    /// batch keeps going.
    pub async fn resolve(&self, id: u64, kind: ElementKind) -> FeatureGeometry {
        let url = format!("{}/lookup.php", self.base_url);
        let osm_ids = format!("{}{}", kind.letter(), id);
        debug!(%url, %osm_ids, "looking up element");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("osm_ids", osm_ids.as_str()),
                ("format", "jsonv2"),
                ("polygon_geojson", "1"),
            ])
            .send()
            .await;

        let bytes = match response.and_then(|r| r.error_for_status()) {
            Ok(response) => response.bytes().await,
            Err(err) => {
                warn!(id, ?kind, error = %err, "element lookup failed");
                return FeatureGeometry::default();
            }
        };

        match bytes {
            Ok(bytes) => parse_lookup_response(&bytes),
            Err(err) => {
                warn!(id, ?kind, error = %err, "failed reading lookup response");
                FeatureGeometry::default()
            }
        }
    }

    /// Resolve all way and node ids, one request per id, in input order.
    ///
    /// Performs exactly `way_ids.len() + node_ids.len()` lookups; empty
    /// geometries contribute no coordinates.
    pub async fn resolve_batch(&self, way_ids: &[u64], node_ids: &[u64]) -> MapData {
        let mut data = MapData::default();

        for &id in way_ids {
            let geometry = self.resolve(id, ElementKind::Way).await;
            data.way_coords.extend(geometry.coords());
            data.ways.push((id, geometry));
        }

        for &id in node_ids {
            let geometry = self.resolve(id, ElementKind::Node).await;
            data.node_coords.extend(geometry.coords());
            data.nodes.push((id, geometry));
        }

        data
    }
}

/// Extract the first element's class and geometry from a lookup response.
/// Anything unexpected yields the empty default geometry.
fn parse_lookup_response(body: &[u8]) -> FeatureGeometry {
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "unparseable lookup response");
            return FeatureGeometry::default();
        }
    };

    let Some(first) = parsed.as_array().and_then(|elements| elements.first()) else {
        return FeatureGeometry::default();
    };

    FeatureGeometry {
        kind: first
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        geojson: first
            .get("geojson")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_way_response() {
        let body = json!([{
            "osm_type": "way",
            "osm_id": 23343233,
            "type": "motorway",
            "geojson": {
                "type": "LineString",
                "coordinates": [[13.38, 52.51], [13.39, 52.52]]
            }
        }])
        .to_string();

        let geometry = parse_lookup_response(body.as_bytes());

        assert_eq!(geometry.kind, "motorway");
        assert_eq!(geometry.coords(), vec![(13.38, 52.51), (13.39, 52.52)]);
        assert_eq!(geometry.coord_at(1), Some((13.39, 52.52)));
        assert_eq!(geometry.coord_at(2), None);
    }

    #[test]
    fn empty_array_yields_default_geometry() {
        let geometry = parse_lookup_response(b"[]");

        assert_eq!(geometry, FeatureGeometry::default());
        assert!(geometry.coords().is_empty());
    }

    #[test]
    fn garbage_yields_default_geometry() {
        assert_eq!(parse_lookup_response(b"not json"), FeatureGeometry::default());
        assert_eq!(parse_lookup_response(b"{}"), FeatureGeometry::default());
    }

    #[test]
    fn point_geometry_yields_one_pair() {
        let geometry = FeatureGeometry {
            kind: "bus_stop".to_owned(),
            geojson: json!({"type": "Point", "coordinates": [13.4, 52.5]}),
        };

        assert_eq!(geometry.coords(), vec![(13.4, 52.5)]);
    }

    #[test]
    fn polygon_rings_are_flattened() {
        let geometry = FeatureGeometry {
            kind: "pedestrian".to_owned(),
            geojson: json!({
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
            }),
        };

        assert_eq!(geometry.coords().len(), 4);
    }

    #[test]
    fn map_data_finds_ways_by_id() {
        let mut data = MapData::default();
        data.ways.push((7, FeatureGeometry::default()));

        assert!(data.way(7).is_some());
        assert!(data.way(8).is_none());
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_empty_geometries() {
        // port 9 (discard) on loopback refuses connections immediately
        let client =
            LookupClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();

        let data = client.resolve_batch(&[1, 2, 2], &[3]).await;

        assert_eq!(data.ways.len(), 3);
        assert_eq!(data.nodes.len(), 1);
        assert!(data.way_coords.is_empty());
        assert!(data.node_coords.is_empty());
        assert!(data.ways.iter().all(|(_, g)| *g == FeatureGeometry::default()));
    }
}
