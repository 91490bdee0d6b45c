mod validators;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{command, value_parser, Arg, ArgAction};
use tracing::info;
use tracing_subscriber::EnvFilter;

use osm_overlay::*;
use validators::*;

const MANIFEST_ARG: &str = "MANIFEST";
const ZOOM_ARG: &str = "ZOOM";
const URL_ARG: &str = "URL";
const LOOKUP_URL_ARG: &str = "LOOKUP_URL";
const TILE_FOLDER_ARG: &str = "TILE_FOLDER";
const FIG_FOLDER_ARG: &str = "FIG_FOLDER";
const PARALLEL_FETCHES_ARG: &str = "PARALLEL_FETCHES";
const TIMEOUT_ARG: &str = "TIMEOUT";
const MAX_TILES_ARG: &str = "MAX_TILES";
const ASPECT_LAT_ARG: &str = "ASPECT_LAT";
const DRY_RUN_ARG: &str = "DRY_RUN";
const VERBOSE_ARG: &str = "VERBOSE";

#[tokio::main]
async fn main() -> Result<()> {
    let matches = command!()
        .arg(
            Arg::new(MANIFEST_ARG)
                .help("JSON manifest naming the ways and nodes to draw")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new(ZOOM_ARG)
                .help("Fixed zoom level (skips estimation from the feature bounds)")
                .value_parser(value_parser!(u8).range(0..=MAX_ZOOM as i64))
                .short('z')
                .long("zoom"),
        )
        .arg(
            Arg::new(URL_ARG)
                .help("Tile URL template with the format specifiers `{z}`, `{x}` and `{y}`. Also supports `{s}`, which rotates through the `a`, `b` and `c` mirrors to spread the load between servers")
                .default_value(DEFAULT_TILE_URL)
                .short('u')
                .long("url"),
        )
        .arg(
            Arg::new(LOOKUP_URL_ARG)
                .help("Base URL of the Nominatim-style element lookup service")
                .default_value(DEFAULT_LOOKUP_URL)
                .long("lookup-url"),
        )
        .arg(
            Arg::new(TILE_FOLDER_ARG)
                .help("The folder the tile cache lives in")
                .value_parser(value_parser!(PathBuf))
                .default_value("tiles")
                .short('o')
                .long("tiles"),
        )
        .arg(
            Arg::new(FIG_FOLDER_ARG)
                .help("The folder rendered figures are written to")
                .value_parser(value_parser!(PathBuf))
                .default_value("figs")
                .long("figs"),
        )
        .arg(
            Arg::new(PARALLEL_FETCHES_ARG)
                .help("The amount of tiles fetched in parallel")
                .value_parser(positive_u8)
                .default_value("5")
                .short('r')
                .long("rate"),
        )
        .arg(
            Arg::new(TIMEOUT_ARG)
                .help("The timeout (in seconds) for a single HTTP request. Pass 0 for no timeout")
                .value_parser(value_parser!(u64))
                .default_value("10")
                .short('t')
                .long("timeout"),
        )
        .arg(
            Arg::new(MAX_TILES_ARG)
                .help("Upper bound on the number of tiles a single run may cover")
                .value_parser(positive_usize)
                .default_value("500")
                .long("max-tiles"),
        )
        .arg(
            Arg::new(ASPECT_LAT_ARG)
                .help("Latitude (in degrees) driving the figure's aspect correction")
                .value_parser(aspect_latitude)
                .allow_hyphen_values(true)
                .default_value("60")
                .long("aspect-lat"),
        )
        .arg(
            Arg::new(DRY_RUN_ARG)
                .help("Resolve the manifest and report the tile volume without fetching or rendering")
                .action(ArgAction::SetTrue)
                .long("dry-run"),
        )
        .arg(
            Arg::new(VERBOSE_ARG)
                .help("Log per-request detail")
                .action(ArgAction::SetTrue)
                .short('v')
                .long("verbose"),
        )
        .get_matches();

    init_tracing(matches.get_flag(VERBOSE_ARG));

    let cfg = Config {
        tile_url: UrlFormat::from_template(
            matches.get_one::<String>(URL_ARG).unwrap().clone(),
        ),
        lookup_url: matches.get_one::<String>(LOOKUP_URL_ARG).unwrap().clone(),
        tile_folder: matches.get_one::<PathBuf>(TILE_FOLDER_ARG).unwrap().clone(),
        fig_folder: matches.get_one::<PathBuf>(FIG_FOLDER_ARG).unwrap().clone(),
        fetch_rate: *matches.get_one::<u8>(PARALLEL_FETCHES_ARG).unwrap(),
        timeout: Duration::from_secs(*matches.get_one::<u64>(TIMEOUT_ARG).unwrap()),
        max_tile_count: *matches.get_one::<usize>(MAX_TILES_ARG).unwrap(),
        zoom: matches.get_one::<u8>(ZOOM_ARG).copied(),
        aspect_lat_deg: *matches.get_one::<f64>(ASPECT_LAT_ARG).unwrap(),
    };

    let manifest_path = matches.get_one::<PathBuf>(MANIFEST_ARG).unwrap();
    run(&cfg, manifest_path, matches.get_flag(DRY_RUN_ARG)).await
}

async fn run(cfg: &Config, manifest_path: &Path, dry_run: bool) -> Result<()> {
    let spec = DrawSpec::from_path(manifest_path)?;
    let stem = manifest_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("manifest path has no usable file name")?;

    let lookup = LookupClient::new(&cfg.lookup_url, cfg.timeout)?;
    let data = lookup.resolve_batch(&spec.ways, &spec.nodes).await;
    info!(
        ways = data.ways.len(),
        nodes = data.nodes.len(),
        coords = data.way_coords.len(),
        "resolved manifest features"
    );

    let bbox = GeoBoundingBox::from_coords(&data.way_coords)
        .context("no usable way geometry resolved, cannot derive map bounds")?;
    let zoom = cfg.zoom.unwrap_or_else(|| zoom_level(&bbox));
    let range = TileRange::from_bbox(&bbox, zoom)?;
    info!(zoom, tiles = range.count(), "computed tile range");

    if dry_run {
        eprintln!(
            "would cover {} tiles (approx {}, assuming 10 kb per tile)",
            range.count(),
            pretty_bytes::converter::convert(range.count() as f64 * 10_000_f64),
        );
        return Ok(());
    }

    let report = fetch_tiles(cfg, &range).await?;
    info!(
        fetched = report.fetched,
        cached = report.cached,
        placeholders = report.placeholders,
        "tile fetch complete"
    );

    let supertile = assemble(&range, &cfg.tile_folder)?;
    let svg = render_svg(&supertile, &range, &data, &spec, cfg.aspect_lat_deg)?;
    let figure = write_figure(&cfg.fig_folder, stem, &svg)?;
    info!(figure = %figure.display(), "figure written");

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
