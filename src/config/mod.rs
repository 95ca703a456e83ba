pub mod path;


use std::{io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{constants::DEVICE_NAME, drivers::flightstick::driver::Timeouts};

/// Represents all possible errors loading a [Config]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Absolute axis codes used for the thumb hat
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HatAxes {
    /// ABS_TILT_X / ABS_TILT_Y
    #[default]
    Tilt,
    /// ABS_RX / ABS_RY
    Rotation,
}

/// Daemon configuration. Every field is optional in the YAML file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    pub version: u32,
    /// Name of the virtual device
    pub name: String,
    /// Delay between poll cycles
    pub poll_interval_ms: u64,
    /// How often to check for hotplug events while devices are connected
    pub hotplug_interval_ms: u64,
    /// How long to wait for hotplug events while no device is connected
    pub idle_wait_ms: u64,
    pub interrupt_timeout_ms: u64,
    pub control_timeout_ms: u64,
    pub hat_axes: HatAxes,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            name: DEVICE_NAME.to_string(),
            poll_interval_ms: 5,
            hotplug_interval_ms: 5000,
            idle_wait_ms: 60_000,
            interrupt_timeout_ms: 1000,
            control_timeout_ms: 200,
            hat_axes: HatAxes::default(),
        }
    }
}

impl Config {
    /// Load a [Config] from the given YAML string
    pub fn from_yaml(content: &str) -> Result<Config, LoadError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a [Config] from the given YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Config, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Config::from_yaml(&content)
    }

    /// Load the configuration from the given path, or from the first config
    /// file found in the search paths. Defaults are used if no file exists.
    pub fn load(path: Option<&Path>) -> Result<Config, LoadError> {
        if let Some(path) = path {
            log::info!("Loading config from {path:?}");
            return Config::from_yaml_file(path);
        }

        let Some(path) = path::find_config() else {
            log::info!("No config file found. Using defaults.");
            return Ok(Config::default());
        };

        log::info!("Loading config from {path:?}");
        Config::from_yaml_file(&path)
    }

    fn validate(&self) -> Result<(), LoadError> {
        let intervals = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("hotplug_interval_ms", self.hotplug_interval_ms),
            ("idle_wait_ms", self.idle_wait_ms),
            ("interrupt_timeout_ms", self.interrupt_timeout_ms),
            ("control_timeout_ms", self.control_timeout_ms),
        ];
        // A zero timeout means "wait forever" to libusb
        for (name, value) in intervals {
            if value == 0 {
                return Err(LoadError::Invalid(format!("{name} must be greater than 0")));
            }
        }
        if self.name.is_empty() {
            return Err(LoadError::Invalid("name must not be empty".into()));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn hotplug_interval(&self) -> Duration {
        Duration::from_millis(self.hotplug_interval_ms)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    /// Returns the transfer timeouts for the driver
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            interrupt: Duration::from_millis(self.interrupt_timeout_ms),
            control: Duration::from_millis(self.control_timeout_ms),
        }
    }
}
