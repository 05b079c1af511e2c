//! The single serial event queue.
//!
//! Sensor callbacks, upload completions and user triggers all arrive on
//! threads the state machine does not own. None of them touch capture state
//! directly: they post an [`Event`] here and the engine applies events one
//! at a time, interleaved with due timers.

use crate::sensor::{MotionSample, SensorRole};
use crate::upload::UploadOutcome;
use crossbeam_channel::Sender;

/// Everything that can happen to the capture pipeline from the outside.
#[derive(Debug)]
pub enum Event {
    /// The wearer asked for a capture cycle
    Trigger,
    /// A motion reading arrived
    Sample {
        role: SensorRole,
        sample: MotionSample,
    },
    /// An upload attempt finished, one way or the other
    UploadFinished {
        session_index: u64,
        outcome: UploadOutcome,
    },
    /// Stop the engine
    Shutdown,
}

/// Delivery target handed to a sensor sampler on activation.
#[derive(Debug, Clone)]
pub struct SampleSink {
    sender: Sender<Event>,
}

impl SampleSink {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { sender }
    }

    /// Post a reading. Readings posted after the engine stopped are dropped.
    pub fn deliver(&self, role: SensorRole, sample: MotionSample) {
        let _ = self.sender.send(Event::Sample { role, sample });
    }
}

/// Completion target handed to the uploader with each request.
#[derive(Debug, Clone)]
pub struct CompletionSink {
    sender: Sender<Event>,
}

impl CompletionSink {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { sender }
    }

    /// Report the outcome of one upload attempt.
    pub fn complete(&self, session_index: u64, outcome: UploadOutcome) {
        let _ = self.sender.send(Event::UploadFinished {
            session_index,
            outcome,
        });
    }
}

/// Cloneable control handle for a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: Sender<Event>,
}

impl EngineHandle {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { sender }
    }

    /// Request a capture cycle. Ignored unless the machine is idle.
    pub fn trigger(&self) {
        let _ = self.sender.send(Event::Trigger);
    }

    /// Ask the engine to stop after the events already queued.
    pub fn shutdown(&self) {
        let _ = self.sender.send(Event::Shutdown);
    }
}
