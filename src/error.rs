//! Custom error types for the sampler.
//!
//! This module defines the primary error type, `AdreadError`, used across the crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the handful of things that can go wrong between loading a channel document and
//! writing the last CSV row.
//!
//! ## Error Hierarchy
//!
//! - **`Configuration`**: semantic errors in the channel document, such as a channel with an
//!   empty coefficient list. Caught during validation, before any sampling.
//! - **`Yaml`** / **`ConfigRead`**: the channel document could not be read or parsed.
//! - **`Settings`**: the layered settings (defaults, TOML, environment) failed to extract or
//!   hold an invalid value.
//! - **`HardwareInit`**: the A/D driver refused to initialize.
//! - **`Read`**: the A/D driver failed while reading one channel during a tick.
//! - **`Sink`**: the output stream rejected a write or a flush.
//! - **`Record`**: a row did not match the header it was written under.
//!
//! Every variant is fatal. Errors propagate with `?` up to `main`, which reports them once
//! and exits with a non-zero status.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Driver Errors
// =============================================================================

/// Broad classification of driver failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// The device could not be opened or prepared.
    Initialization,
    /// The requested channels, resolution or mode are not valid for this board.
    Configuration,
    /// The device returned an implausible value.
    Hardware,
    /// The device could not be talked to (I/O failure, parse failure).
    Communication,
}

impl std::fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DriverErrorKind::Initialization => "initialization",
            DriverErrorKind::Configuration => "configuration",
            DriverErrorKind::Hardware => "hardware",
            DriverErrorKind::Communication => "communication",
        };
        write!(f, "{}", label)
    }
}

/// Error reported by an A/D driver.
#[derive(Error, Debug, Clone)]
#[error("Driver '{driver_type}' {kind} error: {message}")]
pub struct DriverError {
    /// Short driver identifier, e.g. `"iio"` or `"mock"`.
    pub driver_type: String,
    /// Failure class.
    pub kind: DriverErrorKind,
    /// Human readable detail.
    pub message: String,
}

impl DriverError {
    /// Build a driver error.
    pub fn new(
        driver_type: impl Into<String>,
        kind: DriverErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            driver_type: driver_type.into(),
            kind,
            message: message.into(),
        }
    }
}

// =============================================================================
// Application Errors
// =============================================================================

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, AdreadError>;

/// Primary error type for the sampler.
#[derive(Error, Debug)]
pub enum AdreadError {
    /// Semantic problem in the channel configuration.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// The channel document could not be read from disk.
    #[error("Failed to read configuration '{path}': {source}")]
    ConfigRead {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The channel document is not valid YAML for the channel model.
    #[error("Failed to parse channel configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Layered settings could not be extracted.
    #[error("Settings error: {0}")]
    Settings(#[from] Box<figment::Error>),

    /// Settings were extracted but hold an invalid value.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// The A/D driver could not be initialized.
    #[error("Hardware initialization failed: {0}")]
    HardwareInit(#[source] DriverError),

    /// A per-tick channel read failed.
    #[error("Read of channel {channel} failed: {source}")]
    Read {
        /// Channel number that failed.
        channel: u32,
        /// Driver error.
        #[source]
        source: DriverError,
    },

    /// The output sink rejected a row.
    #[error("Output sink error: {0}")]
    Sink(String),

    /// A record did not fit the header: written twice, written before it, or with the
    /// wrong number of values.
    #[error("Record layout error: {0}")]
    Record(String),

    /// A sampler was asked to run after it had already started.
    #[error("Sampler already started; a stopped sampler cannot be restarted")]
    AlreadyStarted,
}

impl From<figment::Error> for AdreadError {
    fn from(err: figment::Error) -> Self {
        AdreadError::Settings(Box::new(err))
    }
}

impl From<csv::Error> for AdreadError {
    fn from(err: csv::Error) -> Self {
        AdreadError::Sink(err.to_string())
    }
}

impl AdreadError {
    /// Whether this error was raised before the sampling loop could start.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            AdreadError::Configuration(_)
                | AdreadError::ConfigRead { .. }
                | AdreadError::Yaml(_)
                | AdreadError::Settings(_)
                | AdreadError::InvalidSetting(_)
                | AdreadError::HardwareInit(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_display_includes_kind_and_driver() {
        let err = DriverError::new("iio", DriverErrorKind::Hardware, "raw value out of range");
        let text = err.to_string();
        assert!(text.contains("iio"));
        assert!(text.contains("hardware"));
        assert!(text.contains("raw value out of range"));
    }

    #[test]
    fn read_error_names_channel() {
        let err = AdreadError::Read {
            channel: 4,
            source: DriverError::new("mock", DriverErrorKind::Communication, "timeout"),
        };
        assert!(err.to_string().contains("channel 4"));
        assert!(!err.is_startup_error());
    }

    #[test]
    fn configuration_errors_are_startup_errors() {
        assert!(AdreadError::Configuration("empty".into()).is_startup_error());
        assert!(AdreadError::HardwareInit(DriverError::new(
            "iio",
            DriverErrorKind::Initialization,
            "no device"
        ))
        .is_startup_error());
        assert!(!AdreadError::Sink("broken pipe".into()).is_startup_error());
    }

    #[test]
    fn record_layout_is_not_a_sink_failure() {
        let err = AdreadError::Record("header already written".into());
        assert!(!matches!(err, AdreadError::Sink(_)));
        assert!(err.to_string().starts_with("Record layout error"));
    }
}
