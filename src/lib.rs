//! Gesture Capture Agent - timed wrist-motion capture and upload.
//!
//! This library captures short bursts of accelerometer and gyroscope data,
//! fuses them into a timestamped table and posts each burst to a remote
//! collector.
//!
//! # Capture cycle
//!
//! A trigger starts a countdown (3, 2, 1). The sensors are then recorded for
//! a fixed capture duration, the session is sealed and handed to the
//! uploader, and after a short cooldown the agent accepts the next trigger.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Gesture Capture Agent                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Sensor    │──▶│    Event    │──▶│   Capture   │        │
//! │  │   Sampler   │   │    Queue    │   │   Machine   │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                          ▲                  │               │
//! │                          │                  ▼               │
//! │                    ┌─────────────┐   ┌─────────────┐        │
//! │                    │  Uploader   │◀──│ Row Buffer  │        │
//! │                    │   (HTTP)    │   │  (session)  │        │
//! │                    └─────────────┘   └─────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sensor readings and upload completions arrive on foreign threads and are
//! funneled through the event queue; only the engine thread mutates capture
//! state.

pub mod capture;
pub mod config;
pub mod engine;
pub mod feedback;
pub mod queue;
pub mod sensor;
pub mod stats;
pub mod upload;

pub use capture::{CaptureState, CaptureStateMachine, Collaborators, FusedRow};
pub use config::Config;
pub use engine::CaptureEngine;
pub use queue::{EngineHandle, Event};
pub use upload::{HttpUploader, UploadConfig, UploadError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
