use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use futures::{stream, StreamExt, TryStreamExt};
use image::{ImageFormat, Rgb, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::Config;
use crate::tile::{TileIndex, TileRange, TILE_SIZE};
use crate::url::UrlFormat;

/// Browser identity sent to the servers; the public OSM mirrors reject the
/// default library user agents.
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:105.0) Gecko/20100101 Firefox/105.0";

const ZERO_DURATION: Duration = Duration::from_secs(0);

/// Outcome of fetching a single tile.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TileStatus {
    /// File already present on disk; no network access performed.
    Cached,
    /// Downloaded from the tile server and persisted.
    Fetched,
    /// Transport failure; a white placeholder was persisted instead.
    Placeholder,
}

/// Aggregate outcome of fetching one tile range.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FetchReport {
    pub fetched: usize,
    pub cached: usize,
    pub placeholders: usize,
}

impl FetchReport {
    fn record(&mut self, status: TileStatus) {
        match status {
            TileStatus::Cached => self.cached += 1,
            TileStatus::Fetched => self.fetched += 1,
            TileStatus::Placeholder => self.placeholders += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.fetched + self.cached + self.placeholders
    }
}

/// Fetch every tile in `range` into the configured tile folder.
///
/// Creates the folder if needed. Tiles already on disk are skipped without
/// network access. Transport failures are not propagated: the affected tile
/// is persisted as a white placeholder so later assembly finds a file at
/// every coordinate of the range.
///
/// Fails without touching the network or the disk when the range covers
/// more tiles than the configured ceiling.
pub async fn fetch_tiles(cfg: &Config, range: &TileRange) -> Result<FetchReport> {
    ensure!(
        range.count() <= cfg.max_tile_count,
        "tile range covers {} tiles, more than the allowed {} (zoom level too high?)",
        range.count(),
        cfg.max_tile_count,
    );

    let tile_folder = cfg.tile_folder.as_path();
    fs::create_dir_all(tile_folder)
        .await
        .context("failed to create tile cache directory")?;

    let mut builder = reqwest::Client::builder();
    if cfg.timeout > ZERO_DURATION {
        builder = builder.timeout(cfg.timeout);
    }

    let client = builder
        .user_agent(USER_AGENT)
        .build()
        .context("failed creating HTTP client")?;

    let pb = ProgressBar::new(range.count() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} ETA: {eta} {msg}",
        )?
        .progress_chars("##-"),
    );

    let client_ref = &client;
    let url_fmt = &cfg.tile_url;
    let pb_ref = &pb;

    let report = stream::iter(range.tiles())
        .map(|tile| async move {
            let status = fetch_tile(client_ref, url_fmt, tile_folder, tile).await?;
            pb_ref.inc(1);
            Ok::<_, anyhow::Error>(status)
        })
        .buffer_unordered(cfg.fetch_rate.max(1) as usize)
        .try_fold(FetchReport::default(), |mut report, status| async move {
            report.record(status);
            Ok(report)
        })
        .await?;

    pb.finish_and_clear();
    debug!(?report, "tile fetch finished");

    Ok(report)
}

/// Fetch a single tile, honoring the disk cache.
///
/// A file that already exists at the tile's path is never re-fetched,
/// placeholders included.
pub async fn fetch_tile(
    client: &reqwest::Client,
    url_fmt: &UrlFormat,
    tile_folder: &Path,
    tile: TileIndex,
) -> Result<TileStatus> {
    let path = tile_folder.join(tile.file_name());

    if path.exists() {
        debug!(?tile, "tile cache hit");
        return Ok(TileStatus::Cached);
    }

    match download_tile(client, url_fmt, tile).await {
        Ok(bytes) => {
            write_atomic(&path, &bytes).await?;
            Ok(TileStatus::Fetched)
        }
        Err(err) => {
            warn!(?tile, error = %err, "tile fetch failed, writing placeholder");
            write_atomic(&path, &placeholder_png()?).await?;
            Ok(TileStatus::Placeholder)
        }
    }
}

async fn download_tile(
    client: &reqwest::Client,
    url_fmt: &UrlFormat,
    tile: TileIndex,
) -> Result<Vec<u8>> {
    let url = url_fmt.tile_url(&tile)?;
    debug!(%url, "downloading tile");

    let response = client.get(&url).send().await.with_context(|| {
        format!("failed fetching tile {}x{}x{}", tile.zoom, tile.x, tile.y)
    })?;

    let bytes = response
        .error_for_status()
        .with_context(|| {
            format!(
                "received invalid status code fetching tile {}x{}x{}",
                tile.zoom, tile.x, tile.y
            )
        })?
        .bytes()
        .await
        .with_context(|| {
            format!("failed reading tile {}x{}x{}", tile.zoom, tile.x, tile.y)
        })?;

    Ok(bytes.to_vec())
}

/// White stand-in written when a download fails, so assembly always finds a
/// file at every coordinate of a fetched range.
fn placeholder_png() -> Result<Vec<u8>> {
    let img = RgbImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgb([255, 255, 255]));

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .context("failed encoding placeholder tile")?;

    Ok(buf.into_inner())
}

/// Write through a temp name and rename, so racing workers never expose a
/// half-written file at the cache key.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("png.part");

    fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("failed writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed moving {} into place", tmp.display()))?;

    Ok(())
}
