//! The capture pipeline core.
//!
//! This module contains:
//! - Row fusion of the accelerometer and gyroscope streams
//! - The per-session row buffer and session bookkeeping
//! - Cancellable timers and the capture cycle state machine

pub mod assembler;
pub mod buffer;
pub mod machine;
pub mod scheduler;
pub mod session;

// Re-export commonly used types
pub use assembler::{FusedRow, RowAssembler};
pub use buffer::{BufferError, SessionBuffer};
pub use machine::{CaptureState, CaptureStateMachine, Collaborators, Step};
pub use scheduler::{Scheduler, TimerId};
pub use session::{CaptureSession, SessionSummary};
