//! Serial ingestion
//!
//! [`SerialIngestor`] owns the device connection. While connected, a reader
//! thread frames incoming bytes into lines, parses them and appends the
//! records to the shared [`RecordStore`]. It is the only writer to the store.
//!
//! State transitions:
//!
//! ```text
//! Disconnected --connect--> Connected --disconnect--> Disconnected
//!                               |
//!                          I/O failure
//!                               v
//!                            Faulted --disconnect/connect--> ...
//! ```

use serde::Serialize;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::serial::{clear_buffers, configure_port, open_port};
use super::stream::{CommunicationChannel, SerialChannel};
use super::{ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS, DOWNLOAD_COMMAND};
use crate::datalog::{parse_line, LineBuffer, Record, RecordStore};

const READ_CHUNK_SIZE: usize = 1024;

/// Connection state of the ingestor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum IngestorState {
    /// No device handle held
    Disconnected,
    /// Reading from `port`
    Connected {
        /// Port being read
        port: String,
    },
    /// The connection to `port` failed while reading; the handle is still
    /// held until the next disconnect or connect
    Faulted {
        /// Port that failed
        port: String,
        /// What the reader saw
        reason: String,
    },
}

/// Notifications posted by the ingestor, in the order they happened.
///
/// The channel is unbounded; whoever holds the receiver has to keep draining
/// it.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestEvent {
    /// The reader started on `port`
    Connected {
        /// Port now being read
        port: String,
    },
    /// A line parsed and was appended to the store. Only sent when
    /// [`IngestorConfig::record_events`] is set.
    Record(Record),
    /// The device stopped responding or the port failed
    ConnectionLost {
        /// Port that failed
        port: String,
        /// End of stream or the I/O error text
        reason: String,
    },
    /// The link to `port` was released
    Disconnected {
        /// Port that was released
        port: String,
    },
}

/// Connection parameters
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Serial line speed
    pub baud_rate: u32,
    /// How long a blocking read waits before the reader checks for a stop
    pub read_timeout: Duration,
    /// Sent (newline-terminated) by [`SerialIngestor::request_download`]
    pub download_command: String,
    /// Post an [`IngestEvent::Record`] for every appended record. Off by
    /// default; the store already holds every record.
    pub record_events: bool,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            download_command: DOWNLOAD_COMMAND.to_string(),
            record_events: false,
        }
    }
}

struct Link {
    port: String,
    writer: Box<dyn CommunicationChannel>,
    stop: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

fn lock(state: &Mutex<IngestorState>) -> MutexGuard<'_, IngestorState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns the device connection and feeds parsed lines into a record store
pub struct SerialIngestor {
    config: IngestorConfig,
    store: RecordStore,
    state: Arc<Mutex<IngestorState>>,
    events: UnboundedSender<IngestEvent>,
    link: Option<Link>,
}

impl SerialIngestor {
    /// Create a disconnected ingestor writing into `store`.
    ///
    /// Returns the receiving end of the event channel alongside it.
    pub fn new(store: RecordStore, config: IngestorConfig) -> (Self, UnboundedReceiver<IngestEvent>) {
        let (events, rx) = unbounded_channel();
        let ingestor = Self {
            config,
            store,
            state: Arc::new(Mutex::new(IngestorState::Disconnected)),
            events,
            link: None,
        };
        (ingestor, rx)
    }

    /// Current state
    pub fn state(&self) -> IngestorState {
        lock(&self.state).clone()
    }

    /// True while the reader is running
    pub fn is_connected(&self) -> bool {
        matches!(*lock(&self.state), IngestorState::Connected { .. })
    }

    /// Name of the port currently held, connected or faulted
    pub fn port(&self) -> Option<&str> {
        self.link.as_ref().map(|l| l.port.as_str())
    }

    /// Store the reader appends to
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Connection parameters in use
    pub fn config(&self) -> &IngestorConfig {
        &self.config
    }

    /// Turn per-record events on or off, from the next connect on
    pub fn set_record_events(&mut self, enabled: bool) {
        self.config.record_events = enabled;
    }

    /// Open `port` and start reading from it
    pub fn connect(&mut self, port: &str) -> Result<(), ProtocolError> {
        self.ensure_not_connected()?;

        let mut serial = open_port(port, self.config.baud_rate, self.config.read_timeout)?;
        configure_port(serial.as_mut())?;
        clear_buffers(serial.as_mut())?;

        self.connect_channel(port, Box::new(SerialChannel::new(serial)))
    }

    /// Start reading from an already-open channel, reported as `port`
    pub fn connect_channel(
        &mut self,
        port: &str,
        mut channel: Box<dyn CommunicationChannel>,
    ) -> Result<(), ProtocolError> {
        self.ensure_not_connected()?;

        let writer = channel.try_clone()?;
        if let Err(e) = channel.clear_input_buffer() {
            debug!("could not clear input on {port}: {e}");
        }

        *lock(&self.state) = IngestorState::Connected {
            port: port.to_string(),
        };
        let _ = self.events.send(IngestEvent::Connected {
            port: port.to_string(),
        });

        let stop = Arc::new(AtomicBool::new(false));
        let reader = ReadLoop {
            port: port.to_string(),
            channel,
            store: self.store.clone(),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            stop: Arc::clone(&stop),
            record_events: self.config.record_events,
        };
        let handle = std::thread::Builder::new()
            .name(format!("templog-reader {port}"))
            .spawn(move || reader.run());

        let reader = match handle {
            Ok(handle) => handle,
            Err(e) => {
                *lock(&self.state) = IngestorState::Disconnected;
                let _ = self.events.send(IngestEvent::Disconnected {
                    port: port.to_string(),
                });
                return Err(ProtocolError::IoError(e));
            }
        };

        info!("connected to {port}");
        self.link = Some(Link {
            port: port.to_string(),
            writer,
            stop,
            reader,
        });
        Ok(())
    }

    /// Stop reading and release the device. Always ends Disconnected.
    pub fn disconnect(&mut self) {
        let Some(link) = self.link.take() else {
            *lock(&self.state) = IngestorState::Disconnected;
            return;
        };

        link.stop.store(true, Ordering::Release);
        drop(link.writer);
        if link.reader.join().is_err() {
            warn!("reader thread for {} panicked", link.port);
        }

        *lock(&self.state) = IngestorState::Disconnected;
        let _ = self.events.send(IngestEvent::Disconnected {
            port: link.port.clone(),
        });
        info!("disconnected from {}", link.port);
    }

    /// Ask the device to send its stored readings
    pub fn request_download(&mut self) -> Result<(), ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }
        let link = self.link.as_mut().ok_or(ProtocolError::NotConnected)?;

        let command = format!("{}\n", self.config.download_command);
        link.writer.write_all(command.as_bytes())?;
        link.writer.flush()?;
        debug!("sent download request to {}", link.port);
        Ok(())
    }

    /// Fails while connected; drops a faulted link so a new one can start
    fn ensure_not_connected(&mut self) -> Result<(), ProtocolError> {
        match self.state() {
            IngestorState::Connected { port } => Err(ProtocolError::AlreadyConnected(port)),
            IngestorState::Faulted { .. } => {
                self.disconnect();
                Ok(())
            }
            IngestorState::Disconnected => Ok(()),
        }
    }
}

impl Drop for SerialIngestor {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Everything the reader thread owns
struct ReadLoop {
    port: String,
    channel: Box<dyn CommunicationChannel>,
    store: RecordStore,
    state: Arc<Mutex<IngestorState>>,
    events: UnboundedSender<IngestEvent>,
    stop: Arc<AtomicBool>,
    record_events: bool,
}

impl ReadLoop {
    fn run(mut self) {
        let mut framer = LineBuffer::new();
        let mut buf = [0u8; READ_CHUNK_SIZE];

        let reason = loop {
            if self.stop.load(Ordering::Acquire) {
                return;
            }
            match self.channel.read(&mut buf) {
                Ok(0) => break "device closed the connection".to_string(),
                Ok(n) => {
                    for line in framer.push(&buf[..n]) {
                        self.ingest(&line);
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) => {}
                Err(e) => break e.to_string(),
            }
        };

        let mut state = lock(&self.state);
        if self.stop.load(Ordering::Acquire) {
            return;
        }
        warn!("connection to {} lost: {}", self.port, reason);
        *state = IngestorState::Faulted {
            port: self.port.clone(),
            reason: reason.clone(),
        };
        let _ = self.events.send(IngestEvent::ConnectionLost {
            port: self.port.clone(),
            reason,
        });
    }

    fn ingest(&self, line: &str) {
        match parse_line(line) {
            Some(record) if self.record_events => {
                self.store.append(record.clone());
                let _ = self.events.send(IngestEvent::Record(record));
            }
            Some(record) => self.store.append(record),
            None => debug!("dropped line from {}: {:?}", self.port, line),
        }
    }
}
