//! Configuration for the gesture capture agent.

use crate::sensor::SensorRole;
use crate::upload::UploadConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the capture agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Countdown, capture and cooldown timing
    pub timing: TimingConfig,

    /// Requested interval between sensor readings
    #[serde(with = "duration_millis")]
    pub sampling_interval: Duration,

    /// Where and how sessions are uploaded
    pub upload: UploadConfig,

    /// Index given to the first session of a run
    pub first_session_index: u64,

    /// Which simulated sensors exist
    pub simulation: SensorConfig,

    /// Whether to sound start/end cues
    pub audio_cues: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            sampling_interval: Duration::from_millis(10),
            upload: UploadConfig::default(),
            first_session_index: 0,
            simulation: SensorConfig::default(),
            audio_cues: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gesture-capture")
            .join("config.json")
    }

    /// Reject settings the capture cycle cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        if self.sampling_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "sampling_interval must be positive".to_string(),
            ));
        }
        self.upload.validate().map_err(ConfigError::Invalid)
    }
}

/// Timing of one capture cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// First number shown by the countdown
    pub countdown_from: u8,
    /// Time between countdown numbers
    #[serde(with = "duration_millis")]
    pub countdown_step: Duration,
    /// How long sensors are recorded
    #[serde(with = "duration_millis")]
    pub capture_duration: Duration,
    /// How long "done" stays up before a new trigger is accepted
    #[serde(with = "duration_millis")]
    pub cooldown: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            countdown_from: 3,
            countdown_step: Duration::from_millis(1000),
            capture_duration: Duration::from_millis(3000),
            cooldown: Duration::from_millis(500),
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=9).contains(&self.countdown_from) {
            return Err(ConfigError::Invalid(format!(
                "countdown_from must be between 1 and 9, got {}",
                self.countdown_from
            )));
        }
        if self.capture_duration.is_zero() {
            return Err(ConfigError::Invalid(
                "capture_duration must be positive".to_string(),
            ));
        }
        let cooldown_ms = self.cooldown.as_millis();
        if !(500..=1000).contains(&cooldown_ms) {
            return Err(ConfigError::Invalid(format!(
                "cooldown must be between 500 and 1000 ms, got {cooldown_ms} ms"
            )));
        }
        Ok(())
    }

    /// Time from trigger to capture start.
    pub fn countdown_total(&self) -> Duration {
        self.countdown_step * u32::from(self.countdown_from)
    }
}

/// Which motion sensors the simulated device has.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub accelerometer: bool,
    pub gyroscope: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            accelerometer: true,
            gyroscope: true,
        }
    }
}

impl SensorConfig {
    /// Parse sensor configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sensors: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        let named = |role: SensorRole| {
            let long = role.to_string().to_lowercase();
            sensors
                .iter()
                .any(|s| s == role.short_name() || *s == long || s == "all")
        };

        Self {
            accelerometer: named(SensorRole::Accelerometer),
            gyroscope: named(SensorRole::Gyroscope),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
