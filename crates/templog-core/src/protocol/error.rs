//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the datalogger
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The port could not be opened
    #[error("Port {port} is unavailable: {reason}")]
    PortUnavailable {
        /// Port name as given to connect
        port: String,
        /// Driver message
        reason: String,
    },

    /// Configuring an open port failed
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// The command needs a live connection
    #[error("Not connected to a datalogger")]
    NotConnected,

    /// A connection to the named port is already running
    #[error("Already connected to {0}")]
    AlreadyConnected(String),

    /// Read or write failure on the channel
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
