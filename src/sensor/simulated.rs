//! Host-side sampler that synthesizes wrist motion.
//!
//! This exists so the agent (and its tests) can run on machines without
//! motion hardware. Each subscribed role gets its own delivery thread, so
//! the two streams interleave the way real sensor callbacks do.

use crate::queue::SampleSink;
use crate::sensor::types::{MotionSample, SensorRole};
use crate::sensor::{SensorError, SensorSampler};
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const GRAVITY: f32 = 9.81;

/// Which simulated sensors exist on the device.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub accelerometer: bool,
    pub gyroscope: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            accelerometer: true,
            gyroscope: true,
        }
    }
}

impl SamplerConfig {
    fn has(&self, role: SensorRole) -> bool {
        match role {
            SensorRole::Accelerometer => self.accelerometer,
            SensorRole::Gyroscope => self.gyroscope,
        }
    }
}

/// A sampler that emits synthetic readings until deactivated.
pub struct SimulatedSampler {
    config: SamplerConfig,
    /// Stop flag of the current subscription, if any
    running: Option<Arc<AtomicBool>>,
}

impl SimulatedSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }
}

impl SensorSampler for SimulatedSampler {
    fn activate(&mut self, interval: Duration, sink: SampleSink) -> Result<(), SensorError> {
        if self.is_active() {
            tracing::debug!("Simulated sensors already subscribed, resubscribing");
            self.deactivate();
        }

        // Check every role up front so a missing gyroscope never leaves a
        // dangling accelerometer subscription behind.
        for role in SensorRole::ALL {
            if !self.config.has(role) {
                return Err(SensorError::SensorUnavailable(role));
            }
        }

        let running = Arc::new(AtomicBool::new(true));
        for role in SensorRole::ALL {
            spawn_stream(role, interval, sink.clone(), running.clone());
        }
        self.running = Some(running);

        tracing::debug!(interval_ms = interval.as_millis() as u64, "Simulated sensors subscribed");
        Ok(())
    }

    fn deactivate(&mut self) {
        // Threads notice the flag on their next tick; readings already in
        // the queue are filtered out by the state machine.
        if let Some(running) = self.running.take() {
            running.store(false, Ordering::SeqCst);
            tracing::debug!("Simulated sensors unsubscribed");
        }
    }

    fn is_active(&self) -> bool {
        self.running
            .as_ref()
            .map(|r| r.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

impl Drop for SimulatedSampler {
    fn drop(&mut self) {
        self.deactivate();
    }
}

fn spawn_stream(role: SensorRole, interval: Duration, sink: SampleSink, running: Arc<AtomicBool>) {
    thread::spawn(move || {
        let started = Instant::now();
        while running.load(Ordering::SeqCst) {
            thread::sleep(interval);
            if !running.load(Ordering::SeqCst) {
                break;
            }
            let t = started.elapsed().as_secs_f32();
            sink.deliver(role, synthesize(role, t));
        }
    });
}

/// A slow wrist swing: 1.5 Hz on the accelerometer, rotation rate in phase.
fn synthesize(role: SensorRole, t: f32) -> MotionSample {
    let phase = TAU * 1.5 * t;
    match role {
        SensorRole::Accelerometer => {
            MotionSample::new(2.0 * phase.sin(), 0.8 * phase.cos(), GRAVITY + 0.5 * phase.sin())
        }
        SensorRole::Gyroscope => {
            MotionSample::new(1.2 * phase.cos(), 0.3 * phase.sin(), -0.6 * phase.cos())
        }
    }
}
