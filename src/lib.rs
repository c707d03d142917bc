//! # adread
//!
//! Periodic A/D sampling for embedded single-board computers. Each tick reads a fixed list of
//! analog channels, converts the raw voltages to physical values with a per-channel
//! calibration polynomial, and writes one timestamped CSV row.
//!
//! ## Crate Structure
//!
//! - **`config`**: the YAML channel document and the validated, immutable [`Configuration`].
//! - **`calibration`**: Horner evaluation of calibration polynomials.
//! - **`timestamp`**: seconds/microseconds split of tick times.
//! - **`record`**: the CSV header and row writer.
//! - **`sampler`**: the `Idle → Running → Stopped` sampling loop.
//! - **`shutdown`**: stop signalling between the signal handler and the sampler.
//! - **`driver`**: the [`AnalogInput`] capability plus IIO and mock implementations.
//! - **`settings`**: layered runtime settings (defaults, TOML, `ADREAD_*` env).
//! - **`logging`**: tracing subscriber setup (stderr only).
//! - **`error`**: [`AdreadError`] and [`DriverError`].
//!
//! [`Configuration`]: config::Configuration
//! [`AnalogInput`]: driver::AnalogInput
//! [`AdreadError`]: error::AdreadError
//! [`DriverError`]: error::DriverError

pub mod calibration;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod record;
pub mod sampler;
pub mod settings;
pub mod shutdown;
pub mod timestamp;

pub use config::{Channel, Configuration};
pub use error::{AdreadError, AppResult};
pub use sampler::{Sampler, SamplerState, Schedule};
