//! morpho: terminal explorer for morphological and thresholding
//! transforms.
//!
//! Loads one image, then reads commands from stdin. Every accepted
//! command recomputes the output and rewrites the output PNG, so an
//! image viewer that reloads on change shows the result live.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin morpho -- --image photo.jpg --variant thresholding
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod sink;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use morpho_engine::{
    Clock, EngineConfig, EngineState, Event, GrayImage, RecomputeDiagnostics, Session,
    StandardRegistry, Variant, source,
};
use tracing_subscriber::EnvFilter;

use crate::sink::Command;

/// Explore morphological and thresholding transforms on one image.
///
/// Commands are read from stdin one per line; type `help` for a list.
#[derive(Parser)]
#[command(name = "morpho", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    #[arg(short, long)]
    image: PathBuf,

    /// Which explorer to run.
    #[arg(long, value_enum, default_value_t = VariantArg::Morphology)]
    variant: VariantArg,

    /// Where the current output image is written after every change.
    #[arg(short, long, default_value = "morpho-out.png")]
    output: PathBuf,

    /// Initial mode, shape and parameter values as a JSON string.
    ///
    /// The JSON must be a valid `EngineConfig` serialization. Its
    /// `variant` field, if present, is overridden by `--variant`.
    #[arg(long)]
    config_json: Option<String>,

    /// Report timing and output statistics for every recompute.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long, requires = "diagnostics")]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    Morphology,
    Thresholding,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Morphology => Self::Morphology,
            VariantArg::Thresholding => Self::Thresholding,
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

fn config_from_cli(cli: &Cli) -> Result<EngineConfig, String> {
    let mut config = match &cli.config_json {
        Some(json) => serde_json::from_str::<EngineConfig>(json)
            .map_err(|e| format!("Invalid --config-json: {e}"))?,
        None => EngineConfig::default(),
    };
    config.variant = cli.variant.into();
    Ok(config)
}

fn load_image(path: &Path) -> Result<GrayImage, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    source::load(&bytes).map_err(|e| format!("Error loading {}: {e}", path.display()))
}

fn write_output(image: &GrayImage, path: &Path) -> Result<(), String> {
    image
        .save(path)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))
}

fn emit_diagnostics(diagnostics: &RecomputeDiagnostics, json: bool) {
    if json {
        match serde_json::to_string(diagnostics) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!("failed to serialize diagnostics: {e}"),
        }
    } else {
        println!("{}", diagnostics.report());
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            tracing::error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image = match load_image(&cli.image) {
        Ok(img) => img,
        Err(msg) => {
            tracing::error!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        path = %cli.image.display(),
        width = image.width(),
        height = image.height(),
        "image loaded"
    );

    let state = match EngineState::from_config(&config, Arc::new(image)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Invalid initial state: {e}");
            return ExitCode::FAILURE;
        }
    };

    let session = Session::new(state, StandardRegistry);
    if let Err(msg) = write_output(session.output(), &cli.output) {
        tracing::error!("{msg}");
        return ExitCode::FAILURE;
    }
    tracing::info!(output = %cli.output.display(), "writing output after every change");

    print!("{}", sink::render_controls(session.state()));
    println!("type 'help' for commands");

    run(session, &cli)
}

fn run(mut session: Session<StandardRegistry>, cli: &Cli) -> ExitCode {
    let variant = session.state().variant();
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("Error reading stdin: {e}");
                return ExitCode::FAILURE;
            }
        };

        let event = match sink::parse_command(&line, variant) {
            Ok(Command::Apply(event)) => event,
            Ok(Command::Show) => {
                print!("{}", sink::render_controls(session.state()));
                continue;
            }
            Ok(Command::Help) => {
                print!("{}", sink::help_text(variant));
                continue;
            }
            Ok(Command::Quit) => break,
            Ok(Command::Nothing) => continue,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };

        if let Err(e) = apply(&mut session, event, cli) {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

/// Apply one event, write the new output, and show what changed.
fn apply(session: &mut Session<StandardRegistry>, event: Event, cli: &Cli) -> Result<(), String> {
    if cli.diagnostics {
        let diagnostics = session
            .dispatch_with_diagnostics(event, &StdClock)
            .map_err(|e| e.to_string())?;
        emit_diagnostics(&diagnostics, cli.json);
    } else {
        session.dispatch(event).map_err(|e| e.to_string())?;
    }
    write_output(session.output(), &cli.output)?;
    if !cli.json {
        print!("{}", sink::render_controls(session.state()));
    }
    Ok(())
}
