//! End-to-end sampling against the mock A/D driver.
//!
//! Time is paused, so the tick schedule is exact and the tests run instantly.

use adread::config::AdcConfig;
use adread::driver::MockAdc;
use adread::shutdown;
use adread::timestamp::TickClock;
use adread::{AdreadError, Configuration, Sampler, SamplerState, Schedule};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Write sink readable while the sampler still owns it.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Accepts the first `lines` lines, then fails every write like a closed pipe.
struct ClosingSink {
    out: SharedBuffer,
    lines: usize,
}

impl Write for ClosingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.out.lines().len();
        if written >= self.lines {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn micros(stamp: (i64, u32)) -> i64 {
    stamp.0 * 1_000_000 + i64::from(stamp.1)
}

fn config(yaml: &str) -> Configuration {
    AdcConfig::from_yaml(yaml).unwrap().validate().unwrap()
}

fn timestamp(row: &str) -> (i64, u32) {
    let mut fields = row.split(',');
    let seconds = fields.next().unwrap().parse().unwrap();
    let micros = fields.next().unwrap().parse().unwrap();
    (seconds, micros)
}

const TWO_CHANNELS: &str = r#"
channels:
  - {name: A, cnum: 0, units: V, c: [0, 1]}
  - {name: B, cnum: 1, units: V, c: [1, 0, 1]}
"#;

const FOUR_CHANNELS: &str = r#"
channels:
  - {name: W, cnum: 0, c: [0, 1]}
  - {name: X, cnum: 1, c: [0, 1]}
  - {name: Y, cnum: 2, c: [0, 1]}
  - {name: Z, cnum: 3, c: [0, 1]}
"#;

#[tokio::test(start_paused = true)]
async fn calibrated_row_for_two_channels() {
    let adc = MockAdc::new().with_voltage(0, 0.5).with_voltage(1, 2.0);
    let sink = SharedBuffer::default();
    let mut sampler = Sampler::new(
        config(TWO_CHANNELS),
        Arc::new(adc),
        sink.clone(),
        Schedule {
            interval: Duration::from_secs(1),
            settle_delay: Duration::from_millis(250),
        },
    );
    let (controller, signal) = shutdown::channel();
    let run = tokio::spawn(async move {
        let result = sampler.run(signal).await;
        (result, sampler.state())
    });

    sleep(Duration::from_millis(500)).await;
    controller.stop();
    let (result, state) = run.await.unwrap();
    result.unwrap();
    assert_eq!(state, SamplerState::Stopped);

    let rows = sink.lines();
    assert_eq!(rows[0], "seconds,microseconds,A,B");
    assert_eq!(rows.len(), 2);
    assert!(rows[1].ends_with(",0.500,5.000"), "row was {}", rows[1]);
}

#[tokio::test(start_paused = true)]
async fn every_row_has_channel_count_plus_two_columns_and_increasing_time() {
    let adc = MockAdc::with_channels(&[0, 1, 2, 3], 1.0, 0.01);
    let sink = SharedBuffer::default();
    let mut sampler = Sampler::new(
        config(FOUR_CHANNELS),
        Arc::new(adc),
        sink.clone(),
        Schedule {
            interval: Duration::from_millis(10),
            settle_delay: Duration::ZERO,
        },
    );
    let (controller, signal) = shutdown::channel();
    let run = tokio::spawn(async move { sampler.run(signal).await });

    sleep(Duration::from_millis(95)).await;
    controller.stop();
    run.await.unwrap().unwrap();

    let rows = sink.lines();
    assert_eq!(rows[0], "seconds,microseconds,W,X,Y,Z");
    // Immediate sample plus one per 10ms up to 90ms
    assert_eq!(rows.len(), 1 + 10);

    for row in &rows {
        assert_eq!(row.split(',').count(), 6, "row was {row}");
    }

    let stamps: Vec<_> = rows[1..].iter().map(|r| timestamp(r)).collect();
    for pair in stamps.windows(2) {
        assert!(pair[0] < pair[1], "{:?} not before {:?}", pair[0], pair[1]);
    }
}

#[tokio::test(start_paused = true)]
async fn read_failure_writes_no_row_and_ends_run() {
    let adc = MockAdc::with_channels(&[0, 1, 2, 3], 1.0, 0.0).with_failure(1);
    let counter = adc.clone();
    let sink = SharedBuffer::default();
    let mut sampler = Sampler::new(
        config(FOUR_CHANNELS),
        Arc::new(adc),
        sink.clone(),
        Schedule::default(),
    );
    let (_controller, signal) = shutdown::channel();

    let err = sampler.run(signal).await.unwrap_err();
    assert!(matches!(err, AdreadError::Read { channel: 1, .. }), "{err}");
    assert_eq!(sampler.state(), SamplerState::Stopped);
    assert_eq!(sampler.ticks(), 0);
    // Channels after the failing one are never read
    assert_eq!(counter.read_count(), 2);
    assert_eq!(sink.lines(), vec!["seconds,microseconds,W,X,Y,Z"]);
}

#[tokio::test(start_paused = true)]
async fn stop_during_tick_finishes_that_row_only() {
    let adc = MockAdc::new()
        .with_voltage(0, 0.5)
        .with_voltage(1, 2.0)
        .with_read_delay(Duration::from_millis(100));
    let counter = adc.clone();
    let sink = SharedBuffer::default();
    let mut sampler = Sampler::new(
        config(TWO_CHANNELS),
        Arc::new(adc),
        sink.clone(),
        Schedule {
            interval: Duration::from_millis(300),
            settle_delay: Duration::ZERO,
        },
    );
    let (controller, signal) = shutdown::channel();
    let run = tokio::spawn(async move { sampler.run(signal).await });

    // First read of the first tick is still in flight
    sleep(Duration::from_millis(50)).await;
    controller.stop();
    run.await.unwrap().unwrap();

    let rows = sink.lines();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].ends_with(",0.500,5.000"), "row was {}", rows[1]);
    assert_eq!(counter.read_count(), 2);

    // No tick starts after the stop even once its slot arrives
    sleep(Duration::from_secs(1)).await;
    assert_eq!(counter.read_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn builtin_channel_table_header() {
    let config = Configuration::load(None).unwrap();
    let adc = MockAdc::with_channels(&config.channel_numbers(), 1.0, 0.0);
    let sink = SharedBuffer::default();
    let mut sampler = Sampler::new(config, Arc::new(adc), sink.clone(), Schedule::default());
    let (controller, signal) = shutdown::channel();
    controller.stop();

    sampler.run(signal).await.unwrap();
    assert_eq!(
        sink.lines(),
        vec!["seconds,microseconds,Ain3,Ain4,Ain5,Ain6"]
    );
}

#[tokio::test(start_paused = true)]
async fn late_ticks_are_stamped_when_they_start() {
    // Reads outlast the interval, so every tick after the first runs late
    let adc = MockAdc::new().with_read_delay(Duration::from_millis(25));
    let sink = SharedBuffer::default();
    let mut sampler = Sampler::new(
        config("channels:\n  - {name: A, cnum: 0, c: [0, 1]}\n"),
        Arc::new(adc),
        sink.clone(),
        Schedule {
            interval: Duration::from_millis(10),
            settle_delay: Duration::ZERO,
        },
    )
    .with_clock(Arc::new(TickClock::start()));
    let (controller, signal) = shutdown::channel();
    let run = tokio::spawn(async move { sampler.run(signal).await });

    // Ticks begin at 0, 25, 50, 75, 100 and 125ms
    sleep(Duration::from_millis(130)).await;
    controller.stop();
    run.await.unwrap().unwrap();

    let rows = sink.lines();
    assert_eq!(rows.len(), 1 + 6);

    let stamps: Vec<i64> = rows[1..].iter().map(|r| micros(timestamp(r))).collect();
    let gaps: Vec<i64> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(gaps, vec![25_000; 5]);
}

#[tokio::test(start_paused = true)]
async fn sink_failure_ends_run_and_stops_reading() {
    let adc = MockAdc::new().with_voltage(0, 0.5).with_voltage(1, 2.0);
    let counter = adc.clone();
    let out = SharedBuffer::default();
    let sink = ClosingSink {
        out: out.clone(),
        lines: 3,
    };
    let mut sampler = Sampler::new(
        config(TWO_CHANNELS),
        Arc::new(adc),
        sink,
        Schedule {
            interval: Duration::from_millis(10),
            settle_delay: Duration::ZERO,
        },
    );
    let (_controller, signal) = shutdown::channel();

    // Header and two rows fit; the third row's write fails
    let err = sampler.run(signal).await.unwrap_err();
    assert!(matches!(err, AdreadError::Sink(_)), "{err}");
    assert_eq!(sampler.state(), SamplerState::Stopped);
    assert_eq!(sampler.ticks(), 2);
    assert_eq!(out.lines().len(), 3);

    let reads = counter.read_count();
    assert_eq!(reads, 3 * 2);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(counter.read_count(), reads);
}

#[tokio::test(start_paused = true)]
async fn no_channels_writes_timestamp_only_rows() {
    let adc = MockAdc::new();
    let counter = adc.clone();
    let sink = SharedBuffer::default();
    let mut sampler = Sampler::new(
        config("channels: []"),
        Arc::new(adc),
        sink.clone(),
        Schedule {
            interval: Duration::from_millis(10),
            settle_delay: Duration::ZERO,
        },
    );
    let (controller, signal) = shutdown::channel();
    let run = tokio::spawn(async move { sampler.run(signal).await });

    sleep(Duration::from_millis(15)).await;
    controller.stop();
    run.await.unwrap().unwrap();

    let rows = sink.lines();
    assert_eq!(rows[0], "seconds,microseconds");
    assert_eq!(rows.len(), 1 + 2);
    for row in &rows[1..] {
        assert_eq!(row.split(',').count(), 2, "row was {row}");
    }
    assert_eq!(counter.read_count(), 0);
}
