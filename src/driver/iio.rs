//! Linux IIO analog input driver.
//!
//! The board A/D converters are exposed by the kernel through the Industrial I/O sysfs
//! interface. For channel `N` the device directory contains:
//!
//! - `in_voltageN_raw` - latest conversion, in LSB
//! - `in_voltageN_scale` or shared `in_voltage_scale` - millivolts per LSB
//! - `in_voltageN_offset` (optional) - LSB added before scaling
//!
//! Voltage is `(raw + offset) * scale / 1000`. Scale and offset are read once at open.

use crate::driver::{AdcInit, AnalogInput, InputMode};
use crate::error::{DriverError, DriverErrorKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const DRIVER: &str = "iio";

#[derive(Debug, Clone)]
struct ChannelFiles {
    raw: PathBuf,
    scale_mv: f64,
    offset: f64,
}

/// IIO sysfs analog input.
#[derive(Debug)]
pub struct IioAdc {
    device: PathBuf,
    channels: HashMap<u32, ChannelFiles>,
    max_raw: u64,
}

impl IioAdc {
    /// Open `device` and prepare every channel listed in `init`.
    pub async fn open(device: PathBuf, init: &AdcInit) -> Result<Self, DriverError> {
        if init.mode != InputMode::SingleEnded {
            return Err(DriverError::new(
                DRIVER,
                DriverErrorKind::Configuration,
                format!("input mode {} is not supported", init.mode.flag()),
            ));
        }
        if !(1..=32).contains(&init.resolution_bits) {
            return Err(DriverError::new(
                DRIVER,
                DriverErrorKind::Configuration,
                format!("unsupported resolution of {} bits", init.resolution_bits),
            ));
        }
        if !tokio::fs::metadata(&device)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(DriverError::new(
                DRIVER,
                DriverErrorKind::Initialization,
                format!("device directory '{}' not found", device.display()),
            ));
        }

        let shared_scale = read_number(&device.join("in_voltage_scale")).await.ok();

        let mut channels = HashMap::with_capacity(init.channels.len());
        for &channel in &init.channels {
            let raw = device.join(format!("in_voltage{channel}_raw"));
            if tokio::fs::metadata(&raw).await.is_err() {
                return Err(DriverError::new(
                    DRIVER,
                    DriverErrorKind::Configuration,
                    format!("channel {channel} not present on '{}'", device.display()),
                ));
            }

            let scale_mv = match read_number(&device.join(format!("in_voltage{channel}_scale"))).await {
                Ok(scale) => scale,
                Err(_) => shared_scale.ok_or_else(|| {
                    DriverError::new(
                        DRIVER,
                        DriverErrorKind::Initialization,
                        format!("no scale available for channel {channel}"),
                    )
                })?,
            };
            let offset = read_number(&device.join(format!("in_voltage{channel}_offset")))
                .await
                .unwrap_or(0.0);

            debug!(channel, scale_mv, offset, "Prepared IIO channel");
            channels.insert(
                channel,
                ChannelFiles {
                    raw,
                    scale_mv,
                    offset,
                },
            );
        }

        Ok(Self {
            device,
            channels,
            max_raw: (1u64 << init.resolution_bits) - 1,
        })
    }

    /// Device directory.
    pub fn device(&self) -> &Path {
        &self.device
    }
}

#[async_trait]
impl AnalogInput for IioAdc {
    async fn read_volts(&self, channel: u32) -> Result<f64, DriverError> {
        let files = self.channels.get(&channel).cloned().ok_or_else(|| {
            DriverError::new(
                DRIVER,
                DriverErrorKind::Configuration,
                format!("channel {channel} was not initialized"),
            )
        })?;

        // sysfs reads block until the conversion completes
        let path = files.raw.clone();
        let text = tokio::task::spawn_blocking(move || std::fs::read_to_string(path))
            .await
            .map_err(|e| {
                DriverError::new(DRIVER, DriverErrorKind::Communication, format!("Task join error: {e}"))
            })?
            .map_err(|e| {
                DriverError::new(
                    DRIVER,
                    DriverErrorKind::Communication,
                    format!("reading '{}': {e}", files.raw.display()),
                )
            })?;

        let raw: i64 = text.trim().parse().map_err(|_| {
            DriverError::new(
                DRIVER,
                DriverErrorKind::Communication,
                format!("channel {channel} returned '{}'", text.trim()),
            )
        })?;
        if raw.unsigned_abs() > self.max_raw {
            return Err(DriverError::new(
                DRIVER,
                DriverErrorKind::Hardware,
                format!("channel {channel} raw value {raw} exceeds {}", self.max_raw),
            ));
        }

        Ok((raw as f64 + files.offset) * files.scale_mv / 1000.0)
    }

    fn name(&self) -> &str {
        DRIVER
    }
}

async fn read_number(path: &Path) -> std::io::Result<f64> {
    let text = tokio::fs::read_to_string(path).await?;
    text.trim()
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
