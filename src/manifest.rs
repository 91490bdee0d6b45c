use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

/// User-supplied drawing manifest: which OSM elements to resolve and draw.
///
/// ```json
/// {
///     "ways": [23343233, 4377228],
///     "nodes": [2394952220],
///     "highlight_way_nodes": {"23343233": 4}
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct DrawSpec {
    /// OSM way ids to resolve and draw.
    #[serde(default)]
    pub ways: Vec<u64>,

    /// OSM node ids to resolve and draw.
    #[serde(default)]
    pub nodes: Vec<u64>,

    /// Way id (as string key) to the vertex index drawn highlighted.
    #[serde(default)]
    pub highlight_way_nodes: HashMap<String, usize>,
}

impl DrawSpec {
    /// Read and parse a manifest file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("failed reading manifest {}", path.display()))?;

        serde_json::from_slice(&raw)
            .with_context(|| format!("manifest {} is not valid JSON", path.display()))
    }

    /// The highlight selectors as `(way id, vertex index)` pairs; keys that
    /// aren't numeric way ids are skipped.
    pub fn highlights(&self) -> impl Iterator<Item = (u64, usize)> + '_ {
        self.highlight_way_nodes.iter().filter_map(|(id, &index)| {
            match id.parse() {
                Ok(id) => Some((id, index)),
                Err(_) => {
                    warn!(key = %id, "ignoring non-numeric highlight way id");
                    None
                }
            }
        })
    }
}
