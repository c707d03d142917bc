//! Runtime settings using Figment.
//!
//! Settings are layered, later layers winning:
//! 1. Built-in defaults
//! 2. An optional TOML settings file
//! 3. Environment variables prefixed with `ADREAD_`
//!
//! Command-line flags are applied on top by the binary.
//!
//! # Example
//! ```no_run
//! use adread::settings::Settings;
//!
//! let settings = Settings::load(None)?;
//! println!("Sampling every {:?}", settings.interval);
//! # Ok::<(), adread::error::AdreadError>(())
//! ```

use crate::driver::{Board, InputMode};
use crate::error::{AdreadError, AppResult};
use crate::logging::LogFormat;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ADREAD_";

/// Sampler and driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Time between ticks.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Delay between driver initialization and the first sample.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Board variant.
    pub board: Board,
    /// Override of the board's default IIO device directory.
    pub device: Option<PathBuf>,
    /// A/D resolution in bits.
    pub resolution_bits: u8,
    /// Input mode passed to the driver.
    pub input_mode: InputMode,
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            settle_delay: Duration::from_millis(250),
            board: Board::default(),
            device: None,
            resolution_bits: 16,
            input_mode: InputMode::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Load defaults, then an optional TOML file, then `ADREAD_*` environment variables,
    /// and validate the result.
    pub fn load(file: Option<&Path>) -> AppResult<Self> {
        let settings = Self::extract(file)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Like [`Settings::load`] but without validation, for callers that still apply
    /// overrides and validate afterwards.
    pub fn extract(file: Option<&Path>) -> AppResult<Self> {
        Ok(Self::figment(file).extract()?)
    }

    /// The provider stack behind [`Settings::load`].
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Validate settings after loading.
    pub fn validate(&self) -> AppResult<()> {
        // Rows carry microsecond timestamps; shorter intervals would repeat them
        if self.interval < Duration::from_micros(1) {
            return Err(AdreadError::InvalidSetting(
                "interval must be at least 1us".to_string(),
            ));
        }

        if !(1..=32).contains(&self.resolution_bits) {
            return Err(AdreadError::InvalidSetting(format!(
                "resolution_bits {} out of range 1-32",
                self.resolution_bits
            )));
        }

        crate::logging::parse_log_level(&self.log_level).map_err(AdreadError::InvalidSetting)?;

        Ok(())
    }
}
