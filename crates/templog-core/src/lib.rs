//! # templog Core Library
//!
//! Core functionality for the templog serial datalogger tool.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial port discovery and a port/drive watcher
//! - Line-oriented datalog ingestion into a shared record store
//! - CSV, Excel and PDF export of stored records
//! - A headless session exposing the tool's commands
//! - A simulated datalogger for running without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use templog_core::prelude::*;
//!
//! let mut session = Session::new(Settings::default());
//! session.refresh_ports();
//! session.connect()?;
//! session.download()?;
//!
//! // ... later
//! session.save_as("datalog.xlsx")?;
//! ```

pub mod config;
pub mod datalog;
pub mod demo;
pub mod export;
pub mod protocol;
pub mod session;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::datalog::{parse_line, ExportFormat, Record, RecordStore};
    pub use crate::demo::DemoDevice;
    pub use crate::export::{export, ExportError};
    pub use crate::protocol::{
        DiscoveryPolicy, IngestEvent, IngestorState, PortInfo, ProtocolError, SerialIngestor,
    };
    pub use crate::session::{Session, SessionError};
    pub use crate::watcher::{PortSnapshot, PortWatcher};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
