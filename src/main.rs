//! Gesture Capture Agent CLI
//!
//! Timed wrist-motion capture with upload to a remote collector.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use gesture_capture_agent::{
    capture::Collaborators,
    config::{Config, SensorConfig},
    feedback::{ConsoleDisplay, CuePlayer, SilentCues, TerminalBell},
    sensor::{simulated::SamplerConfig, SimulatedSampler},
    stats::{create_shared_stats, SharedCaptureStats},
    CaptureEngine, EngineHandle, HttpUploader, VERSION,
};
use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Longest wait for outstanding uploads before exiting after `--cycles`.
const UPLOAD_DRAIN_LIMIT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "gesture-capture")]
#[command(version = VERSION)]
#[command(about = "Timed wrist-motion capture and upload", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the capture agent (Enter triggers a cycle, `q` quits)
    Run {
        /// Trigger this many cycles automatically, then exit
        #[arg(long)]
        cycles: Option<u32>,

        /// Collector URL for this run, e.g. http://192.168.1.9:5001/post
        #[arg(long)]
        url: Option<String>,

        /// Capture duration in milliseconds
        #[arg(long)]
        capture_ms: Option<u64>,

        /// Sensors present on the simulated device (accel, gyro, or all)
        #[arg(long)]
        sensors: Option<String>,

        /// Index of the first session uploaded in this run
        #[arg(long)]
        start_index: Option<u64>,

        /// Disable audio cues
        #[arg(long)]
        no_cues: bool,
    },

    /// Show configuration
    Config,

    /// Store the collector URL in the configuration file
    SetEndpoint {
        /// Collector URL, e.g. http://192.168.1.9:5001/post
        url: String,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

struct RunOptions {
    cycles: Option<u32>,
    url: Option<String>,
    capture_ms: Option<u64>,
    sensors: Option<String>,
    start_index: Option<u64>,
    no_cues: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            cycles,
            url,
            capture_ms,
            sensors,
            start_index,
            no_cues,
        } => cmd_run(RunOptions {
            cycles,
            url,
            capture_ms,
            sensors,
            start_index,
            no_cues,
        }),
        Commands::Config => cmd_config(),
        Commands::SetEndpoint { url } => cmd_set_endpoint(&url),
        Commands::Init { force } => cmd_init(force),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(options: RunOptions) -> anyhow::Result<()> {
    let mut config = Config::load().context("loading configuration")?;

    if let Some(url) = &options.url {
        config.upload.set_endpoint(url).map_err(|e| anyhow!(e))?;
    }
    if let Some(ms) = options.capture_ms {
        config.timing.capture_duration = Duration::from_millis(ms);
    }
    if let Some(sensors) = &options.sensors {
        config.simulation = SensorConfig::from_csv(sensors);
    }
    if let Some(index) = options.start_index {
        config.first_session_index = index;
    }
    if options.no_cues {
        config.audio_cues = false;
    }
    config.validate()?;

    println!("Gesture Capture Agent v{VERSION}");
    println!();
    println!("  Collector: {}", config.upload.url());
    println!(
        "  Countdown: {} x {} ms",
        config.timing.countdown_from,
        config.timing.countdown_step.as_millis()
    );
    println!(
        "  Capture duration: {} ms",
        config.timing.capture_duration.as_millis()
    );
    println!(
        "  Sampling interval: {} ms",
        config.sampling_interval.as_millis()
    );
    println!(
        "  Sensors: accelerometer {}, gyroscope {}",
        if config.simulation.accelerometer { "present" } else { "missing" },
        if config.simulation.gyroscope { "present" } else { "missing" }
    );
    println!();

    // Uploads run on the tokio runtime; the engine keeps its own thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building async runtime")?;

    let uploader = HttpUploader::new(&config.upload, runtime.handle().clone())?;
    let cues: Box<dyn CuePlayer> = if config.audio_cues {
        Box::new(TerminalBell)
    } else {
        Box::new(SilentCues)
    };
    let parts = Collaborators {
        sampler: Box::new(SimulatedSampler::new(SamplerConfig {
            accelerometer: config.simulation.accelerometer,
            gyroscope: config.simulation.gyroscope,
        })),
        uploader: Box::new(uploader),
        display: Box::new(ConsoleDisplay::new()),
        cues,
    };

    let stats = create_shared_stats();
    let engine = CaptureEngine::new(&config, parts, stats.clone());
    let handle = engine.handle();
    let engine_thread = engine.spawn().context("starting capture engine")?;

    let ctrlc_handle = handle.clone();
    ctrlc::set_handler(move || ctrlc_handle.shutdown()).context("setting Ctrl+C handler")?;

    match options.cycles {
        Some(cycles) => {
            let cycle_length = config.timing.countdown_total()
                + config.timing.capture_duration
                + config.timing.cooldown
                + Duration::from_millis(100);
            let stats = stats.clone();
            thread::spawn(move || run_cycles(&handle, &stats, cycles, cycle_length));
        }
        None => {
            println!("Press Enter to capture, q to quit");
            println!();
            thread::spawn(move || read_triggers(&handle));
        }
    }

    engine_thread
        .join()
        .map_err(|_| anyhow!("capture engine panicked"))?;
    runtime.shutdown_timeout(Duration::from_secs(1));

    println!();
    println!("{}", stats.summary());
    Ok(())
}

/// Trigger `cycles` captures back to back, wait for their uploads, then stop.
fn run_cycles(handle: &EngineHandle, stats: &SharedCaptureStats, cycles: u32, cycle_length: Duration) {
    for _ in 0..cycles {
        handle.trigger();
        thread::sleep(cycle_length);
    }

    let started = Instant::now();
    while stats.uploads_pending() > 0 {
        if started.elapsed() >= UPLOAD_DRAIN_LIMIT {
            tracing::warn!(
                pending = stats.uploads_pending(),
                "Giving up on outstanding uploads"
            );
            break;
        }
        thread::sleep(Duration::from_millis(50));
    }
    handle.shutdown();
}

/// Each line on stdin is a trigger; `q` or end of input stops the engine.
fn read_triggers(handle: &EngineHandle) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) if line.trim().eq_ignore_ascii_case("q") => break,
            Ok(_) => handle.trigger(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stdin");
                break;
            }
        }
    }
    handle.shutdown();
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!("Collector URL: {}", config.upload.url());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_set_endpoint(url: &str) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    config.upload.set_endpoint(url).map_err(|e| anyhow!(e))?;
    config.validate()?;
    config.save()?;
    println!("Collector set to {}", config.upload.url());
    Ok(())
}

fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = Config::config_path();
    if path.exists() && !force {
        println!("Configuration already exists at {path:?} (use --force to overwrite)");
        return Ok(());
    }
    Config::default().save()?;
    println!("Wrote default configuration to {path:?}");
    Ok(())
}
