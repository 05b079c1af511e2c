//! Fusion of the two motion streams into timestamped rows.
//!
//! The accelerometer is the driver: every accelerometer reading produces one
//! row, paired with whatever gyroscope reading is newest at that moment. The
//! gyroscope value may be up to one driver interval stale; that is accepted.

use crate::sensor::{MotionSample, SensorRole};
use serde::{Deserialize, Serialize};

/// One row of the output dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedRow {
    /// Milliseconds since capture start
    pub timestamp_ms: u64,
    /// Accelerometer reading that drove this row
    pub accel: MotionSample,
    /// Most recent gyroscope reading at the time
    pub gyro: MotionSample,
}

impl FusedRow {
    pub fn new(timestamp_ms: u64, accel: MotionSample, gyro: MotionSample) -> Self {
        Self {
            timestamp_ms,
            accel,
            gyro,
        }
    }

    /// The six axis values in output column order.
    pub fn values(&self) -> [f32; 6] {
        [
            self.accel.x,
            self.accel.y,
            self.accel.z,
            self.gyro.x,
            self.gyro.y,
            self.gyro.z,
        ]
    }
}

/// Fusion filter holding the newest gyroscope reading.
#[derive(Debug, Default)]
pub struct RowAssembler {
    latest_gyro: Option<MotionSample>,
}

impl RowAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one reading; returns a row when the driver fires with a
    /// gyroscope value on hand.
    pub fn offer(
        &mut self,
        role: SensorRole,
        sample: MotionSample,
        timestamp_ms: u64,
    ) -> Option<FusedRow> {
        match role {
            SensorRole::Accelerometer => self
                .latest_gyro
                .map(|gyro| FusedRow::new(timestamp_ms, sample, gyro)),
            SensorRole::Gyroscope => {
                self.latest_gyro = Some(sample);
                None
            }
        }
    }
}
