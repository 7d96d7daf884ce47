//! Secure-element and file configuration.
//!
//! The device settings describe how the driver reaches the element.
//! They are handed to [`SecureElement::open`](super::SecureElement::open)
//! on every hardware session.

use crate::adapter::RandConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Physical interface to the secure element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    /// Two-wire I2C bus.
    I2c,
    /// Single-wire interface.
    Swi,
    /// USB HID bridge (development kits).
    Hid,
}

/// Secure-element model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// ATECC508A.
    Atecc508a,
    /// ATECC608A.
    Atecc608a,
}

/// Configuration for reaching the secure element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Interface type.
    pub interface: Interface,
    /// Device model.
    pub device_type: DeviceType,
    /// Bus index.
    pub bus: u8,
    /// Device address (8-bit form, shifted left by one).
    pub address: u8,
    /// Bus speed in Hz.
    pub baud: u32,
    /// Delay after wake in microseconds.
    pub wake_delay_us: u32,
    /// Receive retries before giving up.
    pub rx_retries: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            interface: Interface::I2c,
            device_type: DeviceType::Atecc508a,
            bus: 1,
            address: 0xC0,
            baud: 400_000,
            wake_delay_us: 800,
            rx_retries: 20,
        }
    }
}

impl DeviceConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud == 0 {
            return Err(ConfigError::InvalidBaud);
        }
        if self.interface == Interface::I2c && self.address & 0x01 != 0 {
            return Err(ConfigError::InvalidAddress(self.address));
        }
        if self.rx_retries == 0 {
            return Err(ConfigError::InvalidRetries);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid baud rate")]
    InvalidBaud,
    #[error("invalid I2C address {0:#04x} (must be even)")]
    InvalidAddress(u8),
    #[error("receive retries must be at least 1")]
    InvalidRetries,
    #[error("max bytes per reseed must be at least 1")]
    InvalidQuota,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Secure-element settings.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Reseed policy.
    #[serde(default)]
    pub rand: RandConfig,
    /// Command-line driver settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration for the command-line driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Use the secure element (false runs the software-only method).
    pub hardware: bool,
    /// Bytes requested per call.
    pub request_size: usize,
    /// Number of calls if not continuous.
    pub requests: u32,
    /// Run continuously until interrupted.
    pub continuous: bool,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            hardware: true,
            request_size: 32,
            requests: 256,
            continuous: false,
            metrics_port: 9090,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.device.validate()?;
        config.rand.validate()?;
        Ok(config)
    }
}
