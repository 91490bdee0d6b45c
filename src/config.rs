use std::{path::PathBuf, time::Duration};

use crate::url::UrlFormat;

/// Default base URL of the element lookup service.
pub const DEFAULT_LOOKUP_URL: &str = "https://nominatim.openstreetmap.org";

/// Pipeline configuration.
///
/// Server endpoints, folders and limits are all explicit here, so tests can
/// point the pipeline at stub servers, local folders and smaller limits.
#[derive(Debug)]
pub struct Config {
    /// Tile URL template with `{s}`, `{z}`, `{x}` and `{y}` specifiers.
    pub tile_url: UrlFormat,

    /// Base URL of the Nominatim-style lookup service.
    pub lookup_url: String,

    /// The folder the tile cache lives in.
    pub tile_folder: PathBuf,

    /// The folder rendered figures are written to.
    pub fig_folder: PathBuf,

    /// Maximum number of parallel tile downloads.
    pub fetch_rate: u8,

    /// Timeout for a single HTTP request.
    ///
    /// Pass the zero duration to disable the timeout.
    pub timeout: Duration,

    /// Ceiling on the number of tiles a single range may cover.
    pub max_tile_count: usize,

    /// Explicit zoom level; overrides estimation from the feature bounds.
    pub zoom: Option<u8>,

    /// Latitude (in degrees) driving the figure's fixed aspect correction.
    pub aspect_lat_deg: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tile_url: UrlFormat::default(),
            lookup_url: DEFAULT_LOOKUP_URL.to_owned(),
            tile_folder: "tiles".into(),
            fig_folder: "figs".into(),
            fetch_rate: 5,
            timeout: Duration::from_secs(10),
            max_tile_count: 500,
            zoom: None,
            aspect_lat_deg: 60.0,
        }
    }
}
