use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use winit::dpi::LogicalSize;

use nightbloom_engine::device::GpuInit;
use nightbloom_engine::logging::{init_logging, LoggingConfig};
use nightbloom_engine::window::{Runtime, RuntimeConfig};
use nightbloom_field::{FieldApp, FieldConfig, SceneKind};

/// Shows one of the nightbloom particle scenes in a window.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene to show; overrides the config file.
    #[arg(long)]
    scene: Option<SceneKind>,

    /// TOML config; missing keys use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed for a reproducible layout.
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter in env_logger syntax, e.g. "nightbloom_field=debug".
    #[arg(long)]
    log: Option<String>,

    #[arg(long, default_value = "1280")]
    width: f64,

    #[arg(long, default_value = "720")]
    height: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(match args.log {
        Some(filter) => LoggingConfig::with_filter(filter),
        None => LoggingConfig::default(),
    });

    let mut config = match &args.config {
        Some(path) => FieldConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => FieldConfig::default(),
    };
    if let Some(scene) = args.scene {
        config.scene = scene;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate().context("invalid configuration")?;

    log::info!("starting {} scene", config.scene);

    Runtime::run(
        RuntimeConfig {
            title: format!("nightbloom · {}", config.scene),
            initial_size: LogicalSize::new(args.width, args.height),
        },
        GpuInit::default(),
        FieldApp::new(config),
    )
}
