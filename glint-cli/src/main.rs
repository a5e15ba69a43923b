// Glint command line
// Runs the vision pipeline against the robot camera or bench fixtures

mod console;
mod session;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use glint_eye::archive::SnapshotArchive;
use glint_eye::{JsonLineTable, MemoryTable, Pipeline, Publisher, SequenceSource, StateTable, VisionConfig};
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glint")]
#[command(about = "Onboard retro-reflective target tracker", long_about = None)]
#[command(version)]
struct Cli {
    /// Camera host
    #[arg(long = "axis-host")]
    axis_host: Option<String>,

    /// Camera username
    #[arg(long = "axis-user")]
    axis_user: Option<String>,

    /// Camera password
    #[arg(long = "axis-pass")]
    axis_pass: Option<String>,

    /// Run against fixture images instead of the camera
    #[arg(long)]
    file: bool,

    /// Fixture glob for --file
    #[arg(long)]
    pattern: Option<String>,

    /// No keyboard commands; in --file mode process each fixture once
    #[arg(long)]
    headless: bool,

    /// Configuration file path (TOML or JSON)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit table updates as JSON lines on stdout
    #[arg(long)]
    json_table: bool,

    /// Stop after this many processed frames
    #[arg(long)]
    max_cycles: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // stdout may carry table lines
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let table: Arc<dyn StateTable> = if cli.json_table {
        Arc::new(JsonLineTable::new(config.table.name.clone(), std::io::stdout()))
    } else {
        Arc::new(MemoryTable::new(config.table.name.clone()))
    };
    let publisher = Publisher::new(table, config.table.clone());
    let mut pipeline = Pipeline::new(&config, publisher);
    let archive = SnapshotArchive::new(config.archive.clone());

    if cli.file {
        let source = SequenceSource::load(&config.fixtures.pattern, config.processing.resolution)
            .context("Failed to load fixtures")?;

        if cli.headless {
            console::run_headless(source, &mut pipeline, cli.max_cycles);
            Ok(())
        } else {
            let stdin = std::io::stdin();
            console::BenchConsole::new(source, pipeline, archive)
                .run(stdin.lock(), cli.max_cycles)
                .map(|_| ())
        }
    } else {
        let controls = if cli.headless {
            None
        } else {
            let stdin = BufReader::new(std::io::stdin());
            let controls = session::LiveControls::spawn(stdin)
                .context("Failed to read commands from stdin")?;
            Some(controls)
        };

        info!("Tracking with camera at {}", config.camera.host);
        session::run_live(&config, &mut pipeline, &archive, controls.as_ref(), cli.max_cycles)
    }
}

fn load_config(cli: &Cli) -> Result<VisionConfig> {
    let mut config = match &cli.config {
        Some(path) => VisionConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => VisionConfig::default(),
    };
    config.apply_env();

    if let Some(host) = &cli.axis_host {
        config.camera.host = host.clone();
    }
    if let Some(user) = &cli.axis_user {
        config.camera.username = user.clone();
    }
    if let Some(pass) = &cli.axis_pass {
        config.camera.password = pass.clone();
    }
    if let Some(pattern) = &cli.pattern {
        config.fixtures.pattern = pattern.clone();
    }

    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}
