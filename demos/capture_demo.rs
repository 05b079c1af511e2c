//! Demonstration of one gesture capture cycle.
//!
//! This example shows how to:
//! 1. Wire the capture engine to a sampler, uploader, display and cues
//! 2. Trigger a cycle from outside the engine thread
//! 3. Wait for the upload outcome and read the run statistics
//!
//! Run with: cargo run --example capture_demo -- http://127.0.0.1:5001/post
//!
//! Note: Uses simulated sensors. Without a collector listening at the URL the
//! cycle still completes and the upload is reported as a network error.

use std::thread;
use std::time::Duration;

use gesture_capture_agent::{
    capture::Collaborators,
    config::Config,
    feedback::{ConsoleDisplay, SilentCues},
    sensor::{simulated::SamplerConfig, SimulatedSampler},
    stats::create_shared_stats,
    CaptureEngine, HttpUploader,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Gesture Capture Agent - Capture Demo");
    println!("====================================");
    println!();

    let mut config = Config::default();
    if let Some(url) = std::env::args().nth(1) {
        config
            .upload
            .set_endpoint(&url)
            .map_err(anyhow::Error::msg)?;
    }
    println!("Uploading to {}", config.upload.url());
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    let uploader = HttpUploader::new(&config.upload, runtime.handle().clone())?;

    let stats = create_shared_stats();
    let engine = CaptureEngine::new(
        &config,
        Collaborators {
            sampler: Box::new(SimulatedSampler::new(SamplerConfig::default())),
            uploader: Box::new(uploader),
            display: Box::new(ConsoleDisplay::new()),
            cues: Box::new(SilentCues),
        },
        stats.clone(),
    );
    let handle = engine.handle();
    let engine_thread = engine.spawn()?;

    handle.trigger();

    // Countdown, capture and cooldown, then give the upload a moment.
    let cycle = config.timing.countdown_total()
        + config.timing.capture_duration
        + config.timing.cooldown;
    thread::sleep(cycle + Duration::from_millis(200));
    for _ in 0..50 {
        if stats.uploads_pending() == 0 {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    handle.shutdown();
    let _ = engine_thread.join();

    println!();
    println!("{}", stats.summary());
    Ok(())
}
