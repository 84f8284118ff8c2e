use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use live_photo_painter::config::Configuration;
use live_photo_painter::host::SurfaceSize;
use live_photo_painter::media::{self, LibraryIndex, MediaIndex};
use live_photo_painter::processing;
use live_photo_painter::render::filters;
use live_photo_painter::render::renderer::FrameRenderer;
use live_photo_painter::viewer::{self, WindowOptions};

#[derive(Debug, Parser)]
#[command(
    name = "photo-painter",
    version,
    about = "Random photo wallpaper drawn through painterly GPU filters"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Deterministic RNG seed for photo and filter selection (overrides random-seed)
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Print this many selections without opening a window
    #[arg(long = "dry-run", value_name = "ITERATIONS")]
    dry_run: Option<usize>,
    /// Viewport used by --dry-run
    #[arg(long, value_name = "WxH", default_value = "1920x1080")]
    viewport: SurfaceSize,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("live_photo_painter={level}").parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        seed,
        dry_run,
        viewport,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::info!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);

    let rng = match seed.or(cfg.random_seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut index = LibraryIndex::new(cfg.photo_library_paths.clone());

    if let Some(iterations) = dry_run {
        return run_dry_run(&cfg, &index, rng, viewport, iterations);
    }

    if let Err(err) = index.watch() {
        tracing::warn!("{err}; new photos appear after restart");
    }
    // scan before the window opens so the first frame does not wait on it
    match index.query_images() {
        Ok(entries) => tracing::info!(count = entries.len(), "photo library ready"),
        Err(err) => tracing::warn!("{err}"),
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let options = WindowOptions {
        fullscreen: cfg.fullscreen,
    };
    let renderer = FrameRenderer::new(&cfg, index, rng);
    let result = viewer::run_windowed(renderer, options, cancel.clone()).context("viewer failed");
    cancel.cancel();
    result
}

fn run_dry_run(
    cfg: &Configuration,
    index: &LibraryIndex,
    mut rng: StdRng,
    viewport: SurfaceSize,
    iterations: usize,
) -> Result<()> {
    println!(
        "# dry run\n# viewport: {}x{}\n# iterations: {}\n",
        viewport.width, viewport.height, iterations
    );
    for i in 0..iterations {
        let Some(image) = media::select_random(index, &mut rng)? else {
            println!("(no photos found under the configured library paths)");
            return Ok(());
        };
        let frame = match processing::prepare_for_viewport(&image, viewport) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                println!("{i:>4}  {image}  (skipped: out of memory)");
                continue;
            }
            Err(err) => {
                println!("{i:>4}  {image}  (skipped: {err})");
                continue;
            }
        };
        let filter = filters::pick(&cfg.filters, &mut rng)
            .and_then(|idx| cfg.filters.get(idx))
            .map_or("none", |f| f.as_str());
        let c = frame.crop;
        println!(
            "{i:>4}  {image}  filter={filter}  bitmap={}x{}  crop=({:.3}, {:.3}, {:.3}, {:.3})",
            frame.bitmap.width, frame.bitmap.height, c.left, c.top, c.right, c.bottom
        );
    }
    Ok(())
}
