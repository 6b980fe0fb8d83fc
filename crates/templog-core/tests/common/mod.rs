//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use templog_core::protocol::{CommunicationChannel, IngestEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

/// Route library logs through the test harness; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What a scripted channel does once its chunks run out
#[derive(Debug, Clone, Copy)]
pub enum AfterScript {
    /// Report end of stream
    Eof,
    /// Fail like an unplugged adapter
    Unplugged,
    /// Keep timing out, like a quiet but healthy device
    Idle,
}

/// Mock device replaying fixed chunks
pub struct ScriptedChannel {
    chunks: VecDeque<Vec<u8>>,
    after: AfterScript,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedChannel {
    pub fn new(chunks: &[&[u8]], after: AfterScript) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            after,
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Bytes written through any handle to this channel
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }
}

impl Read for ScriptedChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(mut chunk) = self.chunks.pop_front() {
            let n = buf.len().min(chunk.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.push_front(chunk.split_off(n));
            }
            return Ok(n);
        }
        match self.after {
            AfterScript::Eof => Ok(0),
            AfterScript::Unplugged => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            )),
            AfterScript::Idle => {
                thread::sleep(Duration::from_millis(5));
                Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
            }
        }
    }
}

impl Write for ScriptedChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommunicationChannel for ScriptedChannel {
    fn clear_input_buffer(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn try_clone(&self) -> io::Result<Box<dyn CommunicationChannel>> {
        Ok(Box::new(ScriptedChannel {
            chunks: VecDeque::new(),
            after: AfterScript::Idle,
            written: Arc::clone(&self.written),
        }))
    }
}

/// Collect events until one matches `done`, failing the test after 5 seconds
pub fn wait_for_event(
    rx: &mut UnboundedReceiver<IngestEvent>,
    done: impl Fn(&IngestEvent) -> bool,
) -> Vec<IngestEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        match rx.try_recv() {
            Ok(event) => {
                let finished = done(&event);
                seen.push(event);
                if finished {
                    return seen;
                }
            }
            Err(_) => thread::sleep(Duration::from_millis(2)),
        }
    }
    panic!("timed out waiting for event; saw {seen:?}");
}

/// Poll `cond` until it holds, failing the test after 5 seconds
pub fn wait_until(cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not met in time");
        thread::sleep(Duration::from_millis(2));
    }
}
