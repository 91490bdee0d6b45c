use std::{fmt, sync::Mutex};

use anyhow::{Context, Result};
use maplit::hashmap;
use strfmt::strfmt;

use crate::tile::TileIndex;

/// Default tile URL template. `{s}` rotates through the public OSM mirrors,
/// starting at `a`.
pub const DEFAULT_TILE_URL: &str = "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

const OSM_SERVERS: &[&str] = &["a", "b", "c"];

/// A tile URL template with the replacement specifiers `{z}`, `{x}` and
/// `{y}`, plus the optional `{s}` mirror rotation specifier.
pub struct UrlFormat {
    inc: Mutex<u8>,
    format_str: String,
}

impl UrlFormat {
    pub fn from_template(format_str: String) -> Self {
        Self {
            inc: Mutex::new(0),
            format_str,
        }
    }

    fn next_server(&self) -> &'static str {
        let mut inc = self.inc.lock().unwrap();

        let val = *inc;
        *inc = inc.wrapping_add(1);

        OSM_SERVERS[val as usize % OSM_SERVERS.len()]
    }

    pub fn tile_url(&self, tile: &TileIndex) -> Result<String> {
        let vars = hashmap! {
            "s".to_owned() => self.next_server().to_owned(),
            "x".to_owned() => tile.x.to_string(),
            "y".to_owned() => tile.y.to_string(),
            "z".to_owned() => tile.zoom.to_string(),
        };

        strfmt(&self.format_str, &vars).context("failed formatting tile URL")
    }
}

impl Default for UrlFormat {
    fn default() -> Self {
        Self::from_template(DEFAULT_TILE_URL.to_owned())
    }
}

impl PartialEq for UrlFormat {
    fn eq(&self, other: &Self) -> bool {
        self.format_str == other.format_str
    }
}

impl fmt::Debug for UrlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlFormat")
            .field("format_str", &self.format_str)
            .finish()
    }
}
