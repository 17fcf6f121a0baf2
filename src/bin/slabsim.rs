//! slabsim - Slab Allocator Simulation
//!
//! Interactive command-line front end for the slab pool manager:
//! - pick an object size (prompted, or `--size`)
//! - allocate, deallocate the last object, print slab status
//! - run a scripted allocate/deallocate cycle
//!
//! # Examples
//!
//! ```bash
//! # Prompt for the object size
//! slabsim
//!
//! # Fixed size, plain output, JSON status lines
//! slabsim --size 32 --no-color --json
//!
//! # Show the effective configuration
//! slabsim --config slabsim.toml --dump-config
//! ```

use clap::Parser;
use slabsim::{SimConfig, Session};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Slab Allocator Simulation
#[derive(Parser, Debug)]
#[command(name = "slabsim")]
#[command(version = slabsim::VERSION)]
#[command(about = "Slab allocator simulation with per-size-class pools", long_about = None)]
struct Cli {
    /// Object size in bytes (skips the prompt)
    #[arg(short, long, env = "SLABSIM_SIZE")]
    size: Option<usize>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "SLABSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Log directory path
    #[arg(long, default_value = "logs", env = "SLABSIM_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SLABSIM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Also print status reports as JSON
    #[arg(long)]
    json: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

impl Cli {
    /// Command-line flags win over file and environment settings
    fn apply(&self, config: &mut SimConfig) {
        if let Some(size) = self.size {
            config.object_size = Some(size);
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.no_color {
            config.color = false;
        }
        if self.json {
            config.json_status = true;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = SimConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    if cli.dump_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    setup_logging(&cli, &config)?;
    slabsim::pool::metrics::describe();
    info!(version = %slabsim::VERSION, "slabsim starting");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = Session::new(stdin.lock(), stdout.lock(), &config);
    session.run()?;

    Ok(())
}

/// Setup logging to stderr and a daily rolling file
///
/// Stdout carries the menu, so log lines never go there.
fn setup_logging(cli: &Cli, config: &SimConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "slabsim.log");

    let log_level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::WARN);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(config.color)
                .with_target(false),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}
