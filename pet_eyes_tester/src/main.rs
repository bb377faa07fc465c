use anyhow::{Context, bail};
use pet_eyes::pipeline::{FilterConfig, FilterSession, FilterStrategy, FrameTicker, Registry};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod frames;

use frames::{DirectorySource, PngSequenceSink, list_frames};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pet_eyes=info,pet_eyes_tester=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        println!("Usage: pet_eyes_tester <species> <input_frame_dir> <output_dir>");
        println!("Species: {}", species_list());
        return Ok(());
    }
    let species = &args[1];
    let input_dir = PathBuf::from(&args[2]);
    let output_dir = PathBuf::from(&args[3]);
    let config = config_from_env()?;

    // --- 2. Frame I/O ---
    let frames = list_frames(&input_dir).with_context(|| format!("reading {}", input_dir.display()))?;
    if frames.is_empty() {
        bail!("no image files found in {}", input_dir.display());
    }
    std::fs::create_dir_all(&output_dir).with_context(|| format!("creating {}", output_dir.display()))?;
    tracing::info!("{} input frames, strategy {:?}", frames.len(), config.strategy);

    let (source, exhausted) = DirectorySource::new(frames);
    let sink = PngSequenceSink::new(output_dir.clone());

    // --- 3. Session ---
    let ticker = FrameTicker::current(config.refresh_rate_hz)?;
    let session = FilterSession::new(Registry::global(), source, sink, ticker, config);
    let profile = session.set_active_profile(species)?;
    tracing::info!("simulating {} {} vision", profile.icon, profile.name);
    session.set_filtering(true)?;

    // --- 4. Run Until The Source Runs Dry ---
    let delivered = exhausted.await.context("frame source dropped before finishing")?;
    session.set_filtering(false)?;

    let stats = session.stats();
    tracing::info!(
        "processing complete: {delivered} frames read, {} written to {}",
        stats.frames_presented,
        output_dir.display()
    );
    session.end();
    Ok(())
}

fn config_from_env() -> anyhow::Result<FilterConfig> {
    let mut config = FilterConfig::default();
    if let Ok(fps) = env::var("PET_EYES_FPS") {
        config.refresh_rate_hz = fps.parse().with_context(|| format!("PET_EYES_FPS={fps}"))?;
    }
    if let Ok(workers) = env::var("PET_EYES_WORKERS") {
        let workers: usize = workers.parse().with_context(|| format!("PET_EYES_WORKERS={workers}"))?;
        config.strategy = if workers <= 1 {
            FilterStrategy::Sequential
        } else {
            FilterStrategy::Parallel { workers }
        };
    }
    Ok(config)
}

fn species_list() -> String {
    Registry::global()
        .list_profiles()
        .iter()
        .map(|p| p.id)
        .collect::<Vec<_>>()
        .join(", ")
}
