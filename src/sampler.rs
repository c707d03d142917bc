//! Fixed-interval sampling loop.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──run()──▶ Running ──stop / error──▶ Stopped
//! ```
//!
//! `run` writes the header, waits the settling delay, takes one sample immediately and then
//! one per interval until the shutdown signal fires. Each tick:
//!
//! 1. reads the wall clock, which becomes the row timestamp
//! 2. reads every channel in configuration order
//! 3. applies each channel's calibration
//! 4. writes and flushes one row
//!
//! A driver error aborts the tick before anything is written and ends the run with
//! [`AdreadError::Read`]; a sink that rejects a row ends it with [`AdreadError::Sink`]. The
//! shutdown signal is only checked between ticks. Late ticks are delayed rather than
//! bunched, so ticks never overlap. Timestamps are strictly increasing within a run even if
//! the wall clock steps backwards.

use crate::config::Configuration;
use crate::driver::AnalogInput;
use crate::error::{AdreadError, AppResult};
use crate::record::RecordWriter;
use crate::settings::Settings;
use crate::shutdown::ShutdownSignal;
use crate::timestamp::{Clock, StampSequence, SystemClock};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace};

/// Sampler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Constructed, not yet started.
    Idle,
    /// Ticking.
    Running,
    /// Finished; cannot be restarted.
    Stopped,
}

/// Tick timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Time between ticks.
    pub interval: Duration,
    /// Wait before the first sample.
    pub settle_delay: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            settle_delay: Duration::from_millis(250),
        }
    }
}

impl From<&Settings> for Schedule {
    fn from(settings: &Settings) -> Self {
        Self {
            interval: settings.interval,
            settle_delay: settings.settle_delay,
        }
    }
}

/// Reads, calibrates and writes one row per tick.
pub struct Sampler<W: Write> {
    config: Configuration,
    driver: Arc<dyn AnalogInput>,
    writer: RecordWriter<W>,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    stamps: StampSequence,
    state: SamplerState,
    ticks: u64,
}

impl<W: Write + Send> Sampler<W> {
    /// Build an idle sampler writing to `sink`.
    pub fn new(
        config: Configuration,
        driver: Arc<dyn AnalogInput>,
        sink: W,
        schedule: Schedule,
    ) -> Self {
        Self {
            config,
            driver,
            writer: RecordWriter::new(sink),
            schedule,
            clock: Arc::new(SystemClock),
            stamps: StampSequence::new(),
            state: SamplerState::Idle,
            ticks: 0,
        }
    }

    /// Read row timestamps from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Rows written so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Channel configuration in use.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Consume the sampler and return its sink.
    pub fn into_sink(self) -> AppResult<W> {
        self.writer.into_inner()
    }

    /// Sample until `shutdown` fires or an error occurs.
    ///
    /// Can be called once; later calls fail with [`AdreadError::AlreadyStarted`].
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) -> AppResult<()> {
        if self.state != SamplerState::Idle {
            return Err(AdreadError::AlreadyStarted);
        }
        self.state = SamplerState::Running;
        let result = self.run_until_stopped(&mut shutdown).await;
        self.state = SamplerState::Stopped;

        match &result {
            Ok(()) => info!(ticks = self.ticks, "Sampler stopped"),
            Err(e) => error!(ticks = self.ticks, error = %e, "Sampler aborted"),
        }
        result
    }

    async fn run_until_stopped(&mut self, shutdown: &mut ShutdownSignal) -> AppResult<()> {
        let names = self.config.names();
        self.writer.write_header(&names)?;

        info!(
            driver = self.driver.name(),
            channels = self.config.len(),
            interval = ?self.schedule.interval,
            "Sampler started"
        );

        tokio::select! {
            biased;
            _ = shutdown.stopped() => {
                info!("Stop requested before first sample");
                return Ok(());
            }
            _ = sleep(self.schedule.settle_delay) => {}
        }

        let first = Instant::now();
        self.tick().await?;

        let mut ticker = interval_at(first + self.schedule.interval, self.schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.stopped() => break,
                _ = ticker.tick() => self.tick().await?,
            }
        }
        Ok(())
    }

    async fn tick(&mut self) -> AppResult<()> {
        let timestamp = self.stamps.next(self.clock.now());
        let mut values = Vec::with_capacity(self.config.len());
        for channel in self.config.channels() {
            let raw = self
                .driver
                .read_volts(channel.number)
                .await
                .map_err(|source| AdreadError::Read {
                    channel: channel.number,
                    source,
                })?;
            let value = channel.calibration.evaluate(raw);
            trace!(channel = %channel.name, raw, value, "Channel sampled");
            values.push(value);
        }

        self.writer.write_record(timestamp, &values)?;
        self.ticks += 1;
        debug!(tick = self.ticks, %timestamp, "Record written");
        Ok(())
    }
}
