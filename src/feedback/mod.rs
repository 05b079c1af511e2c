//! Wearer-facing feedback: status display and audio cues.
//!
//! Both are collaborators outside the capture core. The state machine only
//! tells them what happened; it never waits on them or reads anything back.

pub mod cue;
pub mod display;

// Re-export commonly used types
pub use cue::{Cue, CueError, CuePlayer, SilentCues, TerminalBell};
pub use display::{ConsoleDisplay, DisplayEvent, StatusDisplay};
