//! Audio cue collaborator.
//!
//! Cues are fire-and-forget. A failing cue is logged by the caller and never
//! changes the capture cycle.

use std::io::Write;

/// Which moment a cue marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    CaptureStart,
    CaptureEnd,
}

/// Error from a cue backend.
#[derive(Debug)]
pub struct CueError(pub String);

impl std::fmt::Display for CueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cue playback failed: {}", self.0)
    }
}

impl std::error::Error for CueError {}

pub trait CuePlayer: Send {
    fn play(&self, cue: Cue) -> Result<(), CueError>;
}

/// Rings the terminal bell on stderr. One ring to start, two to finish.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl CuePlayer for TerminalBell {
    fn play(&self, cue: Cue) -> Result<(), CueError> {
        let rings: &[u8] = match cue {
            Cue::CaptureStart => b"\x07",
            Cue::CaptureEnd => b"\x07\x07",
        };
        let mut stderr = std::io::stderr();
        stderr
            .write_all(rings)
            .and_then(|_| stderr.flush())
            .map_err(|e| CueError(e.to_string()))
    }
}

/// Logs cues without sound.
#[derive(Debug, Default)]
pub struct SilentCues;

impl CuePlayer for SilentCues {
    fn play(&self, cue: Cue) -> Result<(), CueError> {
        tracing::debug!(?cue, "Cue");
        Ok(())
    }
}
