//! The capture engine: one thread, one queue, one state machine.
//!
//! The engine thread is the only place capture state changes. It waits on
//! the event queue until either an event arrives or the next scheduled step
//! falls due, and applies whichever comes first.

use crate::capture::{CaptureStateMachine, Collaborators};
use crate::config::Config;
use crate::queue::{EngineHandle, Event};
use crate::stats::SharedCaptureStats;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

pub struct CaptureEngine {
    machine: CaptureStateMachine,
    receiver: Receiver<Event>,
    sender: Sender<Event>,
}

impl CaptureEngine {
    pub fn new(config: &Config, parts: Collaborators, stats: SharedCaptureStats) -> Self {
        let (sender, receiver) = unbounded();
        let machine = CaptureStateMachine::new(config, parts, sender.clone(), stats);
        Self {
            machine,
            receiver,
            sender,
        }
    }

    /// Get a control handle for this engine.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(self.sender.clone())
    }

    /// Run until a shutdown event is handled. Blocks the calling thread.
    pub fn run(mut self) {
        tracing::debug!("Capture engine running");

        loop {
            self.machine.fire_due(Instant::now());

            let received = match self.machine.next_deadline() {
                Some(deadline) => self.receiver.recv_deadline(deadline),
                None => self
                    .receiver
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            let event = match received {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            // Steps that fell due while events were queued go first, so a
            // backlog of readings cannot stretch the capture window.
            let now = Instant::now();
            self.machine.fire_due(now);
            if !self.machine.handle(event, now) {
                break;
            }
        }

        tracing::debug!("Capture engine stopped");
    }

    /// Run on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("capture-engine".to_string())
            .spawn(move || self.run())
    }
}
