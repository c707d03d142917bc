//! Mock A/D converter.
//!
//! Simulated channels for tests and for running without hardware:
//! - Fixed base voltage per channel (unknown channels read 0 V)
//! - Optional uniform noise
//! - Injectable per-channel failures
//! - Optional per-read latency (uses `tokio::time::sleep`, so paused-time tests stay fast)
//!
//! # Example
//!
//! ```
//! use adread::driver::{AnalogInput, MockAdc};
//!
//! # async fn example() -> Result<(), adread::error::DriverError> {
//! let adc = MockAdc::new().with_voltage(0, 0.5).with_voltage(1, 2.0);
//! assert_eq!(adc.read_volts(1).await?, 2.0);
//! # Ok(())
//! # }
//! ```

use crate::driver::AnalogInput;
use crate::error::{DriverError, DriverErrorKind};
use async_trait::async_trait;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DRIVER: &str = "mock";

/// Simulated analog input.
#[derive(Debug, Clone, Default)]
pub struct MockAdc {
    voltages: HashMap<u32, f64>,
    noise: f64,
    failing: HashSet<u32>,
    read_delay: Option<Duration>,
    reads: Arc<AtomicU64>,
}

impl MockAdc {
    /// Mock with every channel at 0 V and no noise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock reading `voltage` on each of `channels`, with ±`noise` volts of uniform noise.
    pub fn with_channels(channels: &[u32], voltage: f64, noise: f64) -> Self {
        let mut adc = Self::new().with_noise(noise);
        for &channel in channels {
            adc = adc.with_voltage(channel, voltage);
        }
        adc
    }

    /// Set the base voltage of `channel`.
    pub fn with_voltage(mut self, channel: u32, volts: f64) -> Self {
        self.voltages.insert(channel, volts);
        self
    }

    /// Add uniform noise of ±`amplitude` volts to every read.
    pub fn with_noise(mut self, amplitude: f64) -> Self {
        self.noise = amplitude.abs();
        self
    }

    /// Make every read of `channel` fail.
    pub fn with_failure(mut self, channel: u32) -> Self {
        self.failing.insert(channel);
        self
    }

    /// Delay every read by `delay`.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Reads attempted so far, including failed ones. Shared between clones.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalogInput for MockAdc {
    async fn read_volts(&self, channel: u32) -> Result<f64, DriverError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&channel) {
            return Err(DriverError::new(
                DRIVER,
                DriverErrorKind::Hardware,
                format!("simulated failure on channel {channel}"),
            ));
        }

        let base = self.voltages.get(&channel).copied().unwrap_or(0.0);
        if self.noise > 0.0 {
            let mut rng = rand::thread_rng();
            Ok(base + rng.gen_range(-self.noise..self.noise))
        } else {
            Ok(base)
        }
    }

    fn name(&self) -> &str {
        DRIVER
    }
}
