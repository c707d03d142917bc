//! CLI entry point for adread.
//!
//! Samples the configured A/D channels at a fixed interval and writes CSV to stdout. Logs go
//! to stderr.
//!
//! # Usage
//!
//! ```bash
//! adread --interval 500ms channels.yaml > samples.csv
//! adread --ts4800 --interval 2s
//! adread --mock --log-level debug
//! ```

#[cfg(not(test))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use adread::driver::{self, AdcInit, AnalogInput, Board, MockAdc};
use adread::logging::{self, LogFormat, LoggingConfig};
use adread::settings::Settings;
use adread::shutdown::{self, TerminationListener};
use adread::{AdreadError, AppResult, Configuration, Sampler, Schedule};
use anyhow::{Context, Result};
use clap::Parser;
use humantime_serde::re::humantime;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Nominal reading of simulated channels.
const MOCK_VOLTS: f64 = 1.0;
const MOCK_NOISE_VOLTS: f64 = 0.005;

#[derive(Parser, Debug)]
#[command(name = "adread")]
#[command(about = "Sample A/Ds and write to stdout", long_about = None)]
struct Cli {
    /// Channel configuration file (YAML). Uses the built-in Ain3-Ain6 table when omitted
    config: Option<PathBuf>,

    /// A/D sampling interval (e.g. 1s, 250ms, 1m)
    #[arg(long, value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Configure for the TS-4800 CPU board
    #[arg(long)]
    ts4800: bool,

    /// Sample simulated channels instead of hardware
    #[arg(long)]
    mock: bool,

    /// IIO device directory, overriding the board default
    #[arg(long)]
    device: Option<PathBuf>,

    /// Runtime settings file (TOML)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Settings from file and environment with command-line flags on top.
    fn settings(&self) -> AppResult<Settings> {
        let mut settings = Settings::extract(self.settings.as_deref())?;
        if let Some(interval) = self.interval {
            settings.interval = interval;
        }
        if self.ts4800 {
            settings.board = Board::Ts4800;
        }
        if let Some(device) = &self.device {
            settings.device = Some(device.clone());
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            settings.log_format = format;
        }
        settings.validate()?;
        Ok(settings)
    }
}

async fn open_driver(
    mock: bool,
    settings: &Settings,
    config: &Configuration,
) -> AppResult<Arc<dyn AnalogInput>> {
    if mock {
        info!("Using simulated channels");
        return Ok(Arc::new(MockAdc::with_channels(
            &config.channel_numbers(),
            MOCK_VOLTS,
            MOCK_NOISE_VOLTS,
        )));
    }

    let init = AdcInit {
        channels: config.channel_numbers(),
        resolution_bits: settings.resolution_bits,
        mode: settings.input_mode,
        device: settings.device.clone(),
    };
    let adc = driver::open(settings.board, &init)
        .await
        .map_err(AdreadError::HardwareInit)?;
    Ok(Arc::new(adc))
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    let config = Configuration::load(cli.config.as_deref())?;
    let driver = open_driver(cli.mock, &settings, &config).await?;

    let mut termination =
        TerminationListener::install().context("Failed to install signal handlers")?;
    let (controller, signal) = shutdown::channel();

    let mut sampler = Sampler::new(
        config,
        driver,
        std::io::stdout(),
        Schedule::from(&settings),
    );
    let mut task = tokio::spawn(async move { sampler.run(signal).await });

    tokio::select! {
        joined = &mut task => {
            joined.context("Sampler task panicked")??;
        }
        received = termination.recv() => {
            info!(signal = %received, "Termination requested, finishing current tick");
            controller.stop();
            task.await.context("Sampler task panicked")??;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    let logging = LoggingConfig::from_settings(&settings).map_err(anyhow::Error::msg)?;
    logging::init(logging).map_err(anyhow::Error::msg)?;

    if !report(run(cli, settings).await) {
        std::process::exit(1);
    }
    Ok(())
}

/// Log a fatal run error once. Returns whether the run succeeded.
fn report(result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!("adread failed: {e:#}");
            false
        }
    }
}
