//! Motion sample types shared by the sampler and the capture pipeline.

use serde::{Deserialize, Serialize};

/// Which motion stream a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorRole {
    /// Drives row synthesis
    Accelerometer,
    /// Co-sampled with the latest known value
    Gyroscope,
}

impl SensorRole {
    /// Both roles, in activation order.
    pub const ALL: [SensorRole; 2] = [SensorRole::Accelerometer, SensorRole::Gyroscope];

    /// Short name used on the command line and in logs.
    pub fn short_name(&self) -> &'static str {
        match self {
            SensorRole::Accelerometer => "accel",
            SensorRole::Gyroscope => "gyro",
        }
    }
}

impl std::fmt::Display for SensorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorRole::Accelerometer => write!(f, "Accelerometer"),
            SensorRole::Gyroscope => write!(f, "Gyroscope"),
        }
    }
}

/// One stream's instantaneous three-axis reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl MotionSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm of the three axes.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude() {
        let sample = MotionSample::new(3.0, 4.0, 0.0);
        assert!((sample.magnitude() - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_role_names() {
        assert_eq!(SensorRole::Accelerometer.short_name(), "accel");
        assert_eq!(SensorRole::Gyroscope.to_string(), "Gyroscope");
        assert_eq!(SensorRole::ALL[0], SensorRole::Accelerometer);
    }
}
