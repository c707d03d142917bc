//! Channel configuration.
//!
//! The channel document is YAML with one top-level `channels` list:
//!
//! ```yaml
//! channels:
//!   - name: Ain3
//!     cnum: 3
//!     units: volts
//!     c: [0., 1.]
//! ```
//!
//! Parsing produces an [`AdcConfig`]; [`AdcConfig::validate`] turns it into the immutable
//! [`Configuration`] the sampler runs from. List order is column order.

use crate::calibration::Polynomial;
use crate::error::{AdreadError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Channel document used when none is supplied.
pub const DEFAULT_CHANNELS: &str = r#"
channels:
  - name: Ain3
    cnum: 3
    units: volts
    c: [0., 1.]
  - name: Ain4
    cnum: 4
    units: volts
    c: [0., 1.]
  - name: Ain5
    cnum: 5
    units: volts
    c: [0., 1.]
  - name: Ain6
    cnum: 6
    units: volts
    c: [0., 1.]
"#;

/// One entry of the `channels` list, as written in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntry {
    /// Column label.
    pub name: String,
    /// Driver channel number.
    pub cnum: u32,
    /// Free-text unit label.
    #[serde(default)]
    pub units: String,
    /// Calibration coefficients, lowest power first.
    #[serde(default)]
    pub c: Vec<f64>,
}

/// Parsed but unvalidated channel document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdcConfig {
    /// Channels in output column order.
    pub channels: Vec<ChannelEntry>,
}

impl AdcConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> AppResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a YAML document from disk.
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AdreadError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// The built-in default document.
    pub fn builtin() -> AppResult<Self> {
        Self::from_yaml(DEFAULT_CHANNELS)
    }

    /// Check every channel and freeze the configuration.
    ///
    /// Fails if any channel has no coefficients. Duplicate names are allowed but logged, since
    /// they make the header ambiguous. An empty channel list is allowed too; rows then carry
    /// only the timestamp.
    pub fn validate(self) -> AppResult<Configuration> {
        if self.channels.is_empty() {
            tracing::warn!("no channels configured; rows will hold timestamps only");
        }

        let mut seen = HashSet::new();
        let mut channels = Vec::with_capacity(self.channels.len());
        for (index, entry) in self.channels.into_iter().enumerate() {
            if !seen.insert(entry.name.clone()) {
                tracing::warn!(
                    channel = %entry.name,
                    index,
                    "duplicate channel name; header columns will be ambiguous"
                );
            }
            let calibration = Polynomial::new(entry.c).map_err(|_| {
                AdreadError::Configuration(format!(
                    "channel '{}' (cnum {}) has no calibration coefficients",
                    entry.name, entry.cnum
                ))
            })?;
            channels.push(Channel {
                name: entry.name,
                number: entry.cnum,
                units: entry.units,
                calibration,
            });
        }

        Ok(Configuration { channels })
    }
}

/// Validated channel descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Column label.
    pub name: String,
    /// Driver channel number.
    pub number: u32,
    /// Unit label, carried for documentation only.
    pub units: String,
    /// Calibration polynomial.
    pub calibration: Polynomial,
}

/// Immutable, ordered channel list.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    channels: Vec<Channel>,
}

impl Configuration {
    /// Load from an optional path, falling back to [`DEFAULT_CHANNELS`], and validate.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let doc = match path {
            Some(path) => AdcConfig::from_path(path)?,
            None => AdcConfig::builtin()?,
        };
        doc.validate()
    }

    /// Channels in column order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Column labels in order.
    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Driver channel numbers in order.
    pub fn channel_numbers(&self) -> Vec<u32> {
        self.channels.iter().map(|c| c.number).collect()
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Always false for a validated configuration.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
