//! Serial Communication
//!
//! Port discovery, the channel abstraction over the device connection, and
//! the ingestor that turns incoming lines into stored records.

mod error;
pub mod ingestor;
pub mod serial;
pub mod stream;

pub use error::ProtocolError;
pub use ingestor::{IngestEvent, IngestorConfig, IngestorState, SerialIngestor};
pub use serial::{
    clear_buffers, configure_port, discover_ports, list_ports, open_port, DiscoveryPolicy,
    PortInfo,
};
pub use stream::{CommunicationChannel, SerialChannel};

/// Default baud rate of the datalogger
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout for the serial port in milliseconds.
/// Bounds how long a disconnect waits for the reader thread.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// Command asking the datalogger to send its stored readings
pub const DOWNLOAD_COMMAND: &str = "GET_DATA";
