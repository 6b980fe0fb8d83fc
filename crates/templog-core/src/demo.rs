//! Demo Mode - Simulated datalogger for testing
//!
//! Produces datalog lines for running the tool without hardware. The
//! simulated logger watches a cold cabinet drifting around its setpoint and
//! raises `ALARM` when the temperature climbs past a threshold.

use chrono::{Local, NaiveDateTime, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::protocol::{CommunicationChannel, DOWNLOAD_COMMAND};

/// Lines sent back-to-back after a download request
const DOWNLOAD_BURST_LINES: usize = 20;

/// Longest a read blocks before reporting a timeout
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Port name reported for the simulated device
pub const DEMO_PORT_NAME: &str = "demo";

/// Simulated datalogger implementing [`CommunicationChannel`]
pub struct DemoDevice {
    rng: StdRng,
    /// Wall-clock time between live lines
    interval: Duration,
    next_due: Instant,
    /// Device clock, advanced by `sample_step` per line
    clock: NaiveDateTime,
    sample_step: TimeDelta,
    temperature: f64,
    min_temperature: f64,
    setpoint: f64,
    alarm_threshold: f64,
    outbox: VecDeque<u8>,
    inbox: Vec<u8>,
    /// Shared with clones so a request written on one handle is answered on
    /// the reading handle
    pending_burst: Arc<AtomicUsize>,
}

impl DemoDevice {
    /// Create a demo device emitting one line per `interval`
    pub fn new(interval: Duration) -> Self {
        Self::with_rng(StdRng::from_entropy(), interval)
    }

    /// Deterministic device for tests
    pub fn with_seed(seed: u64, interval: Duration) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), interval)
    }

    fn with_rng(rng: StdRng, interval: Duration) -> Self {
        let setpoint = 4.0;
        let mut device = Self {
            rng,
            interval,
            next_due: Instant::now() + interval,
            clock: Local::now().naive_local(),
            sample_step: TimeDelta::seconds(60),
            temperature: setpoint,
            min_temperature: setpoint,
            setpoint,
            alarm_threshold: 8.0,
            outbox: VecDeque::new(),
            inbox: Vec::new(),
            pending_burst: Arc::new(AtomicUsize::new(0)),
        };
        // Tail of a line already in flight when the port opened
        device.outbox.extend(b"3.9,OK\r\n");
        device
    }

    /// Temperature above which lines report `ALARM`
    pub fn set_alarm_threshold(&mut self, threshold: f64) {
        self.alarm_threshold = threshold;
    }

    fn next_line(&mut self) -> String {
        // Random walk pulled back toward the setpoint
        let pull = (self.setpoint - self.temperature) * 0.1;
        self.temperature = (self.temperature + pull + self.rng.gen_range(-0.4..0.4)).clamp(-30.0, 40.0);
        self.min_temperature = self.min_temperature.min(self.temperature);
        self.clock += self.sample_step;

        let status = if self.temperature > self.alarm_threshold {
            "ALARM"
        } else {
            "OK"
        };
        format!(
            "{},{:.1},{:.1},{}\r\n",
            self.clock.format("%Y-%m-%d %H:%M:%S"),
            self.temperature,
            self.min_temperature,
            status
        )
    }

    fn take_burst_line(&self) -> bool {
        self.pending_burst
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Read for DemoDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.outbox.is_empty() {
            if !self.take_burst_line() {
                let now = Instant::now();
                if now < self.next_due {
                    std::thread::sleep((self.next_due - now).min(POLL_INTERVAL));
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "no data yet"));
                }
                self.next_due = now + self.interval;
            }
            let line = self.next_line();
            self.outbox.extend(line.as_bytes());
        }

        let n = buf.len().min(self.outbox.len());
        for (slot, byte) in buf.iter_mut().zip(self.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for DemoDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inbox.extend_from_slice(buf);
        while let Some(pos) = self.inbox.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.inbox.drain(..=pos).collect();
            if String::from_utf8_lossy(&line).trim() == DOWNLOAD_COMMAND {
                self.pending_burst
                    .fetch_add(DOWNLOAD_BURST_LINES, Ordering::AcqRel);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommunicationChannel for DemoDevice {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        // The in-flight fragment is kept on purpose: it is what a real
        // logger looks like when the port opens mid-line
        Ok(())
    }

    fn try_clone(&self) -> io::Result<Box<dyn CommunicationChannel>> {
        let mut clone = DemoDevice::with_rng(StdRng::from_entropy(), self.interval);
        clone.outbox.clear();
        clone.pending_burst = Arc::clone(&self.pending_burst);
        Ok(Box::new(clone))
    }
}
