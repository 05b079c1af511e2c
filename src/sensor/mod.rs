//! Motion sensor access for the capture pipeline.
//!
//! The pipeline never talks to a platform sensor API directly. It talks to a
//! [`SensorSampler`], which subscribes both motion streams and pushes every
//! reading, tagged with its [`SensorRole`], into a [`SampleSink`].

pub mod simulated;
pub mod types;

use crate::queue::SampleSink;
use std::time::Duration;

// Re-export commonly used types
pub use simulated::SimulatedSampler;
pub use types::{MotionSample, SensorRole};

/// Errors that can occur while subscribing the motion streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// The device has no sensor for this role
    SensorUnavailable(SensorRole),
}

impl SensorError {
    /// Message shown to the wearer when a capture cycle is aborted.
    pub fn user_message(&self) -> String {
        match self {
            SensorError::SensorUnavailable(role) => format!("{role} not available"),
        }
    }
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::SensorUnavailable(role) => write!(f, "Sensor unavailable: {role}"),
        }
    }
}

impl std::error::Error for SensorError {}

/// Subscription port over the accelerometer and gyroscope streams.
///
/// Readings are delivered asynchronously through the sink given to
/// [`activate`](SensorSampler::activate). Within one role they arrive in
/// order; there is no ordering between roles.
pub trait SensorSampler: Send {
    /// Subscribe both streams at the requested interval.
    ///
    /// Fails without subscribing anything if either sensor is missing.
    /// Calling it again while active replaces the subscription.
    fn activate(&mut self, interval: Duration, sink: SampleSink) -> Result<(), SensorError>;

    /// Unsubscribe both streams. Safe to call when already inactive.
    fn deactivate(&mut self);

    /// Whether the streams are currently subscribed.
    fn is_active(&self) -> bool;
}
