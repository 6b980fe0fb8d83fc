//! Session
//!
//! The command surface of the tool: everything the buttons of a front-end
//! trigger, without any UI. A session owns the ingestor, the record store and
//! the port list, and keeps a one-line status message describing the last
//! thing that happened.

use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::config::Settings;
use crate::datalog::{ExportFormat, Record, RecordStore};
use crate::export::{self, ExportError};
use crate::protocol::{
    discover_ports, CommunicationChannel, IngestEvent, IngestorState, PortInfo, ProtocolError,
    SerialIngestor,
};

/// Errors returned by session commands
#[derive(Error, Debug)]
pub enum SessionError {
    /// Connect was requested with no port chosen
    #[error("Select a COM port first")]
    NoPortSelected,

    /// The command needs a live connection
    #[error("Please connect to the COM port first")]
    NotConnected,

    /// Opening, reading or writing the device failed
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Saving failed
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Acknowledgement returned by [`Session::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// Records held at the time of submission
    pub record_count: usize,
    /// Status text shown to the user
    pub message: String,
}

/// Headless datalogger session
pub struct Session {
    settings: Settings,
    store: RecordStore,
    ingestor: SerialIngestor,
    events: UnboundedReceiver<IngestEvent>,
    ports: Vec<PortInfo>,
    selected_port: Option<String>,
    status: String,
}

impl Session {
    /// Disconnected session with an empty store; the port from `settings`
    /// starts out selected
    pub fn new(settings: Settings) -> Self {
        let store = RecordStore::new();
        let (ingestor, events) = SerialIngestor::new(store.clone(), settings.ingestor_config());
        let selected_port = settings.port.clone();
        Self {
            settings,
            store,
            ingestor,
            events,
            ports: Vec::new(),
            selected_port,
            status: "Disconnected".to_string(),
        }
    }

    /// Settings the session was created with
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Shared record store
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Snapshot of every record received so far
    pub fn records(&self) -> Vec<Record> {
        self.store.snapshot()
    }

    /// Connection state
    pub fn state(&self) -> IngestorState {
        self.ingestor.state()
    }

    /// One-line description of the last thing that happened
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Ports from the last refresh
    pub fn ports(&self) -> &[PortInfo] {
        &self.ports
    }

    /// Port [`Session::connect`] will use
    pub fn selected_port(&self) -> Option<&str> {
        self.selected_port.as_deref()
    }

    /// Have [`Session::next_event`] and [`Session::poll_events`] also yield
    /// every record as it arrives. Takes effect on the next connect. Events
    /// queue up until drained, so only enable this when polling.
    pub fn set_record_events(&mut self, enabled: bool) {
        self.ingestor.set_record_events(enabled);
    }

    /// Choose the port used by [`Session::connect`]
    pub fn select_port(&mut self, name: impl Into<String>) {
        self.selected_port = Some(name.into());
    }

    /// Rescan ports with the configured discovery policy
    pub fn refresh_ports(&mut self) -> &[PortInfo] {
        let ports = discover_ports(self.settings.discovery);
        self.set_ports(ports);
        &self.ports
    }

    /// Replace the port list, keeping the selection when it is still present
    /// and otherwise selecting the first port
    pub fn set_ports(&mut self, ports: Vec<PortInfo>) {
        let keep = self
            .selected_port
            .as_ref()
            .is_some_and(|sel| ports.iter().any(|p| &p.name == sel));
        if !keep {
            self.selected_port = ports.first().map(|p| p.name.clone());
        }
        if ports.is_empty() {
            self.status = "No active COM ports found.".to_string();
        }
        self.ports = ports;
    }

    /// Connect to the selected port
    pub fn connect(&mut self) -> Result<(), SessionError> {
        let port = self.selected_port.clone().ok_or(SessionError::NoPortSelected)?;
        self.status = format!("Connecting to {port}...");
        match self.ingestor.connect(&port) {
            Ok(()) => {
                self.status = format!("Connected to {port}");
                Ok(())
            }
            Err(e) => {
                self.status = e.to_string();
                Err(e.into())
            }
        }
    }

    /// Connect over an already-open channel (demo device, tests)
    pub fn connect_channel(
        &mut self,
        name: &str,
        channel: Box<dyn CommunicationChannel>,
    ) -> Result<(), SessionError> {
        self.ingestor.connect_channel(name, channel)?;
        self.selected_port = Some(name.to_string());
        self.status = format!("Connected to {name}");
        Ok(())
    }

    /// Release the device; harmless when not connected
    pub fn disconnect(&mut self) {
        self.ingestor.disconnect();
        self.status = "Disconnected".to_string();
    }

    /// Connect when disconnected (or faulted), disconnect when connected
    pub fn toggle_connection(&mut self) -> Result<(), SessionError> {
        if self.ingestor.is_connected() {
            self.disconnect();
            Ok(())
        } else {
            self.connect()
        }
    }

    /// Ask the logger to send its stored readings
    pub fn download(&mut self) -> Result<(), SessionError> {
        match self.ingestor.request_download() {
            Ok(()) => {
                self.status = "Downloading data from datalogger...".to_string();
                Ok(())
            }
            Err(ProtocolError::NotConnected) => Err(SessionError::NotConnected),
            Err(e) => Err(e.into()),
        }
    }

    /// Export a snapshot, choosing the format from the file extension
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<ExportFormat, SessionError> {
        let path = path.as_ref();
        let format = ExportFormat::from_extension(path)
            .ok_or_else(|| ExportError::UnsupportedFormat(path.display().to_string()))?;
        self.save_as_format(path, format)?;
        Ok(format)
    }

    /// Export a snapshot in `format`
    pub fn save_as_format<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: ExportFormat,
    ) -> Result<(), SessionError> {
        let records = self.store.snapshot();
        export::export(&records, path, format)?;
        self.status = format!("{format} file saved successfully!");
        Ok(())
    }

    /// Acknowledge the current data. Nothing is sent anywhere.
    pub fn submit(&mut self) -> SubmitReceipt {
        let receipt = SubmitReceipt {
            record_count: self.store.len(),
            message: "Data submitted successfully!".to_string(),
        };
        info!("submit acknowledged ({} records)", receipt.record_count);
        self.status = receipt.message.clone();
        receipt
    }

    /// Drain pending ingestor events, updating the status line
    pub fn poll_events(&mut self) -> Vec<IngestEvent> {
        let mut drained = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.apply(&event);
                    drained.push(event);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }

    /// Wait for the next ingestor event
    pub async fn next_event(&mut self) -> Option<IngestEvent> {
        let event = self.events.recv().await?;
        self.apply(&event);
        Some(event)
    }

    fn apply(&mut self, event: &IngestEvent) {
        match event {
            IngestEvent::ConnectionLost { port, reason } => {
                self.status = format!("Connection to {port} lost: {reason}");
            }
            IngestEvent::Disconnected { .. } => self.status = "Disconnected".to_string(),
            IngestEvent::Connected { port } => self.status = format!("Connected to {port}"),
            IngestEvent::Record(_) => {}
        }
    }
}
