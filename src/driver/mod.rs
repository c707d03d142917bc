//! A/D driver capability and board selection.
//!
//! The sampler only needs one thing from the hardware: a voltage for a channel number. That
//! contract is [`AnalogInput`]. Two implementations ship with the crate:
//!
//! - [`IioAdc`] - Linux IIO sysfs analog inputs, used for the TS-4200 and TS-4800 boards
//! - [`MockAdc`] - simulated channels for tests and bench-top runs
//!
//! # Contract
//!
//! - `read_volts` is called once per channel per tick, in configuration order
//! - Calls are never concurrent: the next read starts after the previous one returned
//! - There is no timeout; a read that never returns stalls the sampler

use crate::error::DriverError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub mod iio;
pub mod mock;

pub use iio::IioAdc;
pub use mock::MockAdc;

/// Capability: single-shot analog voltage reads.
#[async_trait]
pub trait AnalogInput: Send + Sync {
    /// Read one channel.
    ///
    /// # Returns
    /// - Ok(volts) on success
    /// - Err on hardware or communication failure
    async fn read_volts(&self, channel: u32) -> Result<f64, DriverError>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

/// Supported single-board computers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    /// Technologic Systems TS-4200 on a TS-8160 carrier.
    #[default]
    Ts4200,
    /// Technologic Systems TS-4800.
    Ts4800,
}

impl Board {
    /// IIO device directory exposing this board's A/D converter.
    pub fn default_device(&self) -> PathBuf {
        match self {
            Board::Ts4200 => PathBuf::from("/sys/bus/iio/devices/iio:device0"),
            Board::Ts4800 => PathBuf::from("/sys/bus/iio/devices/iio:device1"),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Board::Ts4200 => write!(f, "TS-4200"),
            Board::Ts4800 => write!(f, "TS-4800"),
        }
    }
}

/// How channels are referenced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Each channel measured against ground (mode 0).
    #[default]
    SingleEnded,
    /// Channel pairs measured against each other (mode 1).
    Differential,
}

impl InputMode {
    /// Numeric mode flag as used by board documentation.
    pub fn flag(&self) -> u8 {
        match self {
            InputMode::SingleEnded => 0,
            InputMode::Differential => 1,
        }
    }
}

/// Driver initialization parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AdcInit {
    /// Channel numbers that will be read.
    pub channels: Vec<u32>,
    /// Converter resolution in bits.
    pub resolution_bits: u8,
    /// Input mode.
    pub mode: InputMode,
    /// Device directory, or `None` for the board default.
    pub device: Option<PathBuf>,
}

impl AdcInit {
    /// Parameters for `channels` with 16-bit single-ended defaults.
    pub fn new(channels: Vec<u32>) -> Self {
        Self {
            channels,
            resolution_bits: 16,
            mode: InputMode::SingleEnded,
            device: None,
        }
    }
}

/// Open the A/D converter of `board`.
pub async fn open(board: Board, init: &AdcInit) -> Result<IioAdc, DriverError> {
    let device = init
        .device
        .clone()
        .unwrap_or_else(|| board.default_device());
    tracing::info!(
        board = %board,
        device = %device.display(),
        channels = ?init.channels,
        resolution_bits = init.resolution_bits,
        mode = init.mode.flag(),
        "Opening A/D converter"
    );
    IioAdc::open(device, init).await
}
