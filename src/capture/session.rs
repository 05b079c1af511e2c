//! One capture cycle's data: index, start reference and row buffer.

use crate::capture::assembler::{FusedRow, RowAssembler};
use crate::capture::buffer::{BufferError, SessionBuffer};
use crate::sensor::{MotionSample, SensorRole};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// Accelerometer magnitude at or below which the wrist counts as still.
pub const STILLNESS_THRESHOLD: f32 = 0.3;

/// Trailing stillness longer than this marks the gesture as ended.
pub const STILLNESS_DURATION_MS: u64 = 2000;

/// An open capture session. Created when capture starts, sealed at finalize.
#[derive(Debug)]
pub struct CaptureSession {
    index: u64,
    started_at: Instant,
    started_at_utc: DateTime<Utc>,
    buffer: SessionBuffer,
    assembler: RowAssembler,
    accel_samples: u64,
    gyro_samples: u64,
    /// Driver readings that arrived before any gyroscope reading
    unpaired_accel: u64,
    /// Offset of the last accelerometer reading above the stillness threshold
    last_movement_ms: Option<u64>,
}

impl CaptureSession {
    /// Open a session with an empty buffer.
    pub fn new(index: u64, now: Instant) -> Self {
        Self {
            index,
            started_at: now,
            started_at_utc: Utc::now(),
            buffer: SessionBuffer::new(),
            assembler: RowAssembler::new(),
            accel_samples: 0,
            gyro_samples: 0,
            unpaired_accel: 0,
            last_movement_ms: None,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn row_count(&self) -> usize {
        self.buffer.len()
    }

    /// Milliseconds since capture start, never negative.
    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started_at).as_millis() as u64
    }

    /// Feed one reading through the assembler; returns whether a row was
    /// appended.
    pub fn record(
        &mut self,
        role: SensorRole,
        sample: MotionSample,
        now: Instant,
    ) -> Result<bool, BufferError> {
        match role {
            SensorRole::Accelerometer => self.accel_samples += 1,
            SensorRole::Gyroscope => self.gyro_samples += 1,
        }

        let timestamp_ms = self.elapsed_ms(now);
        if role == SensorRole::Accelerometer && sample.magnitude() > STILLNESS_THRESHOLD {
            self.last_movement_ms = Some(timestamp_ms);
        }

        match self.assembler.offer(role, sample, timestamp_ms) {
            Some(row) => {
                self.buffer.append(row)?;
                Ok(true)
            }
            None => {
                if role == SensorRole::Accelerometer {
                    self.unpaired_accel += 1;
                }
                Ok(false)
            }
        }
    }

    /// Seal the buffer and hand back its rows with a summary.
    pub fn seal(&mut self, now: Instant) -> Result<(Vec<FusedRow>, SessionSummary), BufferError> {
        let rows = self.buffer.seal_and_take()?;
        let duration_ms = self.elapsed_ms(now);
        let row_rate_hz = if duration_ms > 0 {
            rows.len() as f64 * 1000.0 / duration_ms as f64
        } else {
            0.0
        };
        let trailing_still_ms = duration_ms.saturating_sub(self.last_movement_ms.unwrap_or(0));

        let summary = SessionSummary {
            index: self.index,
            started_at_utc: self.started_at_utc,
            rows: rows.len(),
            accel_samples: self.accel_samples,
            gyro_samples: self.gyro_samples,
            unpaired_accel: self.unpaired_accel,
            duration_ms,
            row_rate_hz,
            trailing_still_ms,
            went_still: trailing_still_ms > STILLNESS_DURATION_MS,
        };
        Ok((rows, summary))
    }
}

/// What a sealed session contained.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub index: u64,
    pub started_at_utc: DateTime<Utc>,
    pub rows: usize,
    pub accel_samples: u64,
    pub gyro_samples: u64,
    pub unpaired_accel: u64,
    pub duration_ms: u64,
    pub row_rate_hz: f64,
    /// Time from the last movement to the end of capture
    pub trailing_still_ms: u64,
    /// Whether the wrist held still long enough to end the gesture
    pub went_still: bool,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "session {}: {} rows in {} ms ({:.1} Hz), {} accel / {} gyro readings, {} unpaired, still for {} ms",
            self.index,
            self.rows,
            self.duration_ms,
            self.row_rate_hz,
            self.accel_samples,
            self.gyro_samples,
            self.unpaired_accel,
            self.trailing_still_ms
        )
    }
}
