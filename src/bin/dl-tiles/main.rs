mod args;
mod validators;
mod viewport;

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use dl_tiles::{
    download, http_client, search, BoundingBox, DirectoryStore, HttpTileSource, Location,
    Progress, StoreMetadata, TilePlan, UrlFormat, ZoomRange,
};

use args::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = args::command().get_matches();

    let zoom = *matches.get_one::<ZoomRange>(ZOOM_ARG).unwrap();
    let global_zoom = *matches.get_one::<ZoomRange>(GLOBAL_ZOOM_ARG).unwrap();
    let max_tiles = match *matches.get_one::<u64>(MAX_TILES_ARG).unwrap() {
        0 => None,
        n => Some(n),
    };
    let auto_scale = !matches.get_flag(NO_SCALE_ARG);
    let concurrency = *matches.get_one::<usize>(PARALLEL_FETCHES_ARG).unwrap();
    let url = UrlFormat::from_string(matches.get_one::<String>(URL_ARG).unwrap().clone());
    let output = matches.get_one::<String>(OUTPUT_ARG).unwrap().clone();
    let timeout = Duration::from_secs(*matches.get_one::<u64>(TIMEOUT_ARG).unwrap());
    let quiet = matches.get_flag(QUIET_ARG);

    let client = http_client(timeout)?;

    let explicit = BoundingBox::from_parts(
        matches.get_one::<f64>(BBOX_NORTH_ARG).copied(),
        matches.get_one::<f64>(BBOX_EAST_ARG).copied(),
        matches.get_one::<f64>(BBOX_SOUTH_ARG).copied(),
        matches.get_one::<f64>(BBOX_WEST_ARG).copied(),
    )?;

    let mut description = String::new();
    let bbox = match explicit {
        Some(bbox) => {
            if matches.contains_id(LOCATION_ARG) {
                bail!("specify either a location or a bounding box, not both");
            }
            bbox
        }
        None => {
            let location = match matches.get_one::<String>(LOCATION_ARG) {
                Some(raw) => Location::Query(raw.clone()),
                None => bail!("you must specify either a location or a bounding box"),
            };

            let place = search(&client, &location)
                .await
                .context("failed geocoding the location")?;

            println!("{}", place.display_name);
            println!("- n: {}", place.bounding_box.north);
            println!("- e: {}", place.bounding_box.east);
            println!("- s: {}", place.bounding_box.south);
            println!("- w: {}", place.bounding_box.west);

            description = place.display_name;
            place.bounding_box
        }
    };

    if let (Some(file), Some(code)) = (
        matches.get_one::<String>(VIEWPORT_FILE_ARG),
        matches.get_one::<String>(CITY_CODE_ARG),
    ) {
        viewport::save_viewport(Path::new(file), code, &bbox)
            .await
            .context("failed saving the viewport")?;
    }

    let plan = TilePlan::with_budget(&bbox, zoom, max_tiles, auto_scale)?;
    let overview_plan =
        TilePlan::with_budget(&BoundingBox::WORLD, global_zoom, max_tiles, auto_scale)?;

    if matches.get_flag(DRY_RUN_ARG) {
        let total = plan.total() + overview_plan.total();
        eprintln!(
            "would download {} tiles (approx {}, assuming 10 kB per tile)",
            total,
            pretty_bytes::converter::convert(total as f64 * 10_000f64)
        );
        return Ok(());
    }

    let source = HttpTileSource::new(client, url);
    let mut store = DirectoryStore::new(output);
    let metadata = StoreMetadata {
        description,
        ..StoreMetadata::default()
    };

    run_pass("region", &plan, &source, &mut store, &metadata, concurrency, quiet).await?;
    run_pass(
        "overview",
        &overview_plan,
        &source,
        &mut store,
        &metadata,
        concurrency,
        quiet,
    )
    .await?;

    Ok(())
}

async fn run_pass(
    label: &str,
    plan: &TilePlan,
    source: &HttpTileSource,
    store: &mut DirectoryStore,
    metadata: &StoreMetadata,
    concurrency: usize,
    quiet: bool,
) -> Result<()> {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(plan.total())
    };
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} ETA: {eta} {msg}",
        )?
        .progress_chars("##-"),
    );

    let sink = |progress: Progress| {
        pb.set_position(progress.processed);
        pb.set_message(format!("{:.1} tiles/s", progress.speed));
    };

    let summary = download(plan, source, store, metadata, concurrency, Some(&sink))
        .await
        .with_context(|| format!("failed downloading the {} tiles", label))?;

    pb.finish_and_clear();
    println!(
        "{}: downloaded {} tiles in {:.1?} (zoom {})",
        label,
        summary.processed,
        summary.elapsed,
        plan.zoom()
    );

    Ok(())
}
