use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::Parser;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use gluegap::source::ReplayBackend;
use gluegap::{
    FilterConfig, FilterControls, Inspection, InspectionConfig, InspectionMode, Inspector, LiveFeed,
    StaticSequence, ZoneContourMeasurer,
};

/// Polls without a new live frame before the capture counts as stalled.
const MAX_IDLE_POLLS: u32 = 50;

#[derive(Parser)]
#[command(name = "gluegap")]
#[command(about = "Measure glue gaps between pieces inside fixed inspection zones")]
struct Cli {
    /// Static image file or directory (also the fallback when live capture fails)
    #[arg(long, value_name = "PATH")]
    images: PathBuf,

    /// Live capture source: a directory of frames replayed as a stream
    #[arg(long, value_name = "URI")]
    live: Option<String>,

    /// Inspection config (JSON); built-in zones are used otherwise
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Apply the band-pass threshold
    #[arg(long)]
    bandpass: bool,

    /// Band-pass lower bound
    #[arg(long, value_name = "TEXT", default_value = "0")]
    bandpass_min: String,

    /// Band-pass upper bound
    #[arg(long, value_name = "TEXT", default_value = "255")]
    bandpass_max: String,

    /// Apply the Laplacian filter
    #[arg(long)]
    laplacian: bool,

    /// Detect contours and measure gaps inside the zones
    #[arg(long)]
    edges: bool,

    /// Draw the zone rectangles
    #[arg(long)]
    zones: bool,

    /// Number of cycles to run in live mode
    #[arg(long, default_value_t = 10)]
    frames: u32,

    /// Delay between live cycles, and replay frame period
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Write annotated frames as PNG to this directory
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Save every stage output to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => InspectionConfig::load(path)?,
        None => InspectionConfig::default(),
    };

    let mut controls = FilterControls::default();
    controls.set_bandpass_enabled(args.bandpass);
    controls.set_laplacian_enabled(args.laplacian);
    controls.set_edge_detection_enabled(args.edges);
    controls.set_zone_overlay_enabled(args.zones);
    // A rejected update keeps the default window, the warning is logged.
    let _ = controls.update_bandpass(&args.bandpass_min, &args.bandpass_max);
    let filters = controls.snapshot();

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir)?;
    }

    let mut debug_out = args.debug_out.clone();
    let interval = Duration::from_millis(args.interval_ms);

    if let Some(uri) = &args.live {
        let live_size = config.zone_set(InspectionMode::Live)?.frame_size();
        match LiveFeed::open(&ReplayBackend::new(interval), uri, Some(live_size)) {
            Ok(feed) => {
                let inspector = build_inspector(&config, InspectionMode::Live, debug_out.take())?;
                if run_live(feed, &inspector, &filters, &args, interval)? {
                    return Ok(());
                }
                warn!("live capture failed, reverting to static images");
            }
            Err(err) => warn!(%err, "cannot open live capture, using static images"),
        }
    }

    let static_size = config.zone_set(InspectionMode::Static)?.frame_size();
    let sequence = StaticSequence::load(&args.images, static_size)?;
    let inspector = build_inspector(&config, InspectionMode::Static, debug_out)?;
    run_static(sequence, &inspector, &filters, args.output.as_deref())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn build_inspector(
    config: &InspectionConfig,
    mode: InspectionMode,
    debug_out: Option<PathBuf>,
) -> anyhow::Result<Inspector> {
    let inspector = Inspector::new(ZoneContourMeasurer::from_config(config, mode)?);
    match debug_out {
        Some(dir) => inspector.with_debug(dir),
        None => Ok(inspector),
    }
}

fn run_static(
    mut sequence: StaticSequence,
    inspector: &Inspector,
    filters: &FilterConfig,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    info!(frames = sequence.len(), "inspecting static images");
    loop {
        let title = format!("Image {}", sequence.index());
        let inspection = inspector.process(sequence.current(), filters);
        report(&title, &inspection, output)?;
        if sequence.is_last() {
            break;
        }
        sequence.advance();
    }
    Ok(())
}

/// Returns `false` when the capture failed and the caller should fall back.
fn run_live(
    mut feed: LiveFeed,
    inspector: &Inspector,
    filters: &FilterConfig,
    args: &Cli,
    interval: Duration,
) -> anyhow::Result<bool> {
    let mut last_sequence = 0;
    let mut dropped = 0;
    let mut cycle = 0;

    while cycle < args.frames {
        thread::sleep(interval);
        let published = match feed.next_after(last_sequence, interval, MAX_IDLE_POLLS) {
            Ok(Some(published)) => published,
            Ok(None) => {
                warn!(idle_polls = MAX_IDLE_POLLS, "live capture stalled");
                return Ok(false);
            }
            Err(err) => {
                warn!(%err, "live capture stopped");
                return Ok(false);
            }
        };
        dropped += published.sequence - last_sequence - 1;
        last_sequence = published.sequence;

        cycle += 1;
        if let Ok(captured_at) = published.captured_at.format(&Rfc3339) {
            debug!(sequence = published.sequence, %captured_at, "processing live frame");
        }
        let title = format!("Live frame {}", published.sequence);
        let inspection = inspector.process(published.frame, filters);
        report(&title, &inspection, args.output.as_deref())?;
    }

    info!(cycles = cycle, published = feed.published(), dropped, "live inspection finished");
    feed.close();
    Ok(true)
}

fn report(title: &str, inspection: &Inspection, output: Option<&Path>) -> anyhow::Result<()> {
    println!("\n=== {} ===", title);
    match &inspection.report {
        Some(report) => print!("{}", report),
        None => println!("(edge detection disabled)"),
    }

    let histogram = inspection.histogram();
    let (peak, peak_count) = histogram.peak();
    println!(
        "histogram: {} samples{}, mean {:.1}, peak {} ({} samples)",
        histogram.total(),
        if inspection.grayscale { " (grayscale)" } else { "" },
        histogram.mean(),
        peak,
        peak_count
    );

    if let Some(dir) = output {
        let file_name = format!("{}.png", title.to_lowercase().replace(' ', "_"));
        let path = dir.join(file_name);
        inspection
            .frame
            .to_dynamic()
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", path.display(), e))?;
    }
    Ok(())
}
