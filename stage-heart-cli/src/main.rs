//! # Stage Heart - Pitch Practice CLI
//!
//! Terminal front-end for the Stage Heart pitch tools. It shows a live
//! note/cents readout from the microphone and runs the hold-note
//! stability test.
//!
//! ## Architecture
//! - **Main Thread**: renders readings and handles user input
//! - **Audio Thread**: owned by `LiveDetector`, captures and analyses audio
//! - **Stdin Thread**: turns an Enter key press into a stop signal
//! - **Communication**: Crossbeam channels between all three

mod display;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Receiver;
use stage_heart_core::{DetectionRange, HoldNoteTest, LiveDetector, TunerConfig};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for stage-heart
#[derive(Parser, Debug)]
#[command(name = "stage-heart")]
#[command(about = "Live pitch readout and hold-note practice")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    tuning: TuningArgs,

    #[command(subcommand)]
    command: Command,
}

/// Overrides applied on top of the configuration file.
#[derive(Args, Debug)]
struct TuningArgs {
    /// JSON configuration file
    #[arg(short, long, global = true, env = "STAGE_HEART_CONFIG")]
    config: Option<PathBuf>,

    /// Named detection range (voice, bass, guitar, piano)
    #[arg(short, long, global = true)]
    range: Option<String>,

    /// Lowest frequency to report, in Hz
    #[arg(long, global = true)]
    min_hz: Option<f32>,

    /// Highest frequency to report, in Hz
    #[arg(long, global = true)]
    max_hz: Option<f32>,

    /// Reference pitch for A4, in Hz
    #[arg(long, global = true)]
    a4: Option<f32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the detected note and cents deviation live
    Listen {
        /// Stop after this many seconds instead of waiting for Enter
        #[arg(short, long)]
        seconds: Option<u64>,
    },
    /// Hold one note for 8 seconds and rate its stability
    Hold,
    /// List the named detection ranges
    Ranges,
    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a configuration file, using any override flags given
    Init {
        path: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

fn main() -> Result<()> {
    // Initialize tracing on stderr so readings on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stage_heart=info,stage_heart_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli.tuning)?;

    match cli.command {
        Command::Listen { seconds } => listen(config, seconds.map(Duration::from_secs)),
        Command::Hold => hold(config),
        Command::Ranges => {
            for (name, range) in DetectionRange::presets() {
                println!("{:<8} {:>7.1} - {:>7.1} Hz", name, range.min_hz, range.max_hz);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Init { path, force }) => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            config
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Configuration written to {}", path.display());
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            println!("{:#?}", config);
            Ok(())
        }
    }
}

/// Loads the configuration file (or defaults) and applies flag overrides.
fn resolve_config(args: &TuningArgs) -> Result<TunerConfig> {
    let mut config = match &args.config {
        Some(path) => TunerConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => TunerConfig::default(),
    };

    if let Some(name) = &args.range {
        config.detection_range = DetectionRange::preset(name)?;
    }
    if let Some(min_hz) = args.min_hz {
        config.detection_range.min_hz = min_hz;
    }
    if let Some(max_hz) = args.max_hz {
        config.detection_range.max_hz = max_hz;
    }
    if let Some(a4) = args.a4 {
        config.reference_a4 = a4;
    }

    config.validate().context("Invalid settings")?;
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

fn start_detector(config: TunerConfig) -> Result<LiveDetector> {
    let detector = LiveDetector::start(config).context("Cannot start pitch detection")?;
    info!(
        "Listening at {} Hz, range {:.1}-{:.1} Hz, A4 = {} Hz",
        detector.sample_rate(),
        config.detection_range.min_hz,
        config.detection_range.max_hz,
        config.reference_a4
    );
    Ok(detector)
}

/// Spawns a thread that signals once a line (Enter) is read from stdin.
fn enter_pressed() -> Receiver<()> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
        let _ = tx.send(());
    });
    rx
}

fn listen(config: TunerConfig, duration: Option<Duration>) -> Result<()> {
    let mut detector = start_detector(config)?;
    let stop_rx = enter_pressed();
    let deadline = match duration {
        Some(d) => crossbeam_channel::after(d),
        None => crossbeam_channel::never(),
    };
    let colour = io::stdout().is_terminal();
    let mut stdout = io::stdout().lock();
    let mut last_line = String::new();

    writeln!(stdout, "Press Enter to stop.")?;
    loop {
        crossbeam_channel::select! {
            recv(detector.readings()) -> msg => {
                let Ok(reading) = msg else { break };
                let line = display::render_reading(&reading, colour);
                if line != last_line {
                    write!(stdout, "\r\x1b[2K{}", line)?;
                    stdout.flush()?;
                    last_line = line;
                }
            },
            recv(stop_rx) -> _ => break,
            recv(deadline) -> _ => break,
        }
    }
    writeln!(stdout)?;

    detector.stop();
    Ok(())
}

fn hold(config: TunerConfig) -> Result<()> {
    let mut detector = start_detector(config)?;
    let stop_rx = enter_pressed();
    let colour = io::stdout().is_terminal();
    let mut stdout = io::stdout().lock();

    writeln!(stdout, "Sing or play one note and hold it. Press Enter to cancel.")?;
    let mut test = HoldNoteTest::start(Instant::now());
    let outcome = loop {
        crossbeam_channel::select! {
            recv(detector.readings()) -> msg => {
                let Ok(reading) = msg else { break None };
                let now = Instant::now();
                if let Some(cents) = reading.cents_deviation {
                    test.record(cents, now);
                }
                if let Some(outcome) = test.poll(now) {
                    break Some(outcome);
                }
                write!(
                    stdout,
                    "\r\x1b[2K{:>4.1}s {}",
                    test.remaining(now).as_secs_f32(),
                    display::render_reading(&reading, colour)
                )?;
                stdout.flush()?;
            },
            recv(stop_rx) -> _ => {
                let discarded = test.cancel();
                debug!("Discarded {} hold readings", discarded);
                break None;
            },
        }
    };
    writeln!(stdout)?;
    detector.stop();

    match outcome {
        Some(outcome) => writeln!(stdout, "{}", display::render_outcome(&outcome))?,
        None => writeln!(stdout, "Hold test cancelled.")?,
    }
    Ok(())
}
