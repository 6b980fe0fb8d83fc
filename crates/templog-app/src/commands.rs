//! Command implementations

use anyhow::{bail, Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Duration;
use templog_core::config::Settings;
use templog_core::datalog::{import_csv, ExportFormat, Record, TemperatureSeries};
use templog_core::demo::{DemoDevice, DEMO_PORT_NAME};
use templog_core::export::{self, generate_filename};
use templog_core::protocol::{discover_ports, DiscoveryPolicy, IngestEvent, PortInfo};
use templog_core::session::Session;
use templog_core::watcher::{PortSnapshot, PortWatcher};
use tracing::{info, warn};

/// One-line description of a port
pub fn describe_port(port: &PortInfo) -> String {
    match (port.vid, port.pid) {
        (Some(vid), Some(pid)) => format!(
            "{} [{:04x}:{:04x}] {}",
            port.name,
            vid,
            pid,
            port.product.as_deref().unwrap_or("")
        )
        .trim_end()
        .to_string(),
        _ => port.name.clone(),
    }
}

/// One-line description of a record, as shown while capturing
pub fn describe_record(record: &Record) -> String {
    format!(
        "{}  temp {}  min {}  {}",
        record.timestamp(),
        record.temperature(),
        record.min_temperature(),
        record.status()
    )
}

pub fn ports(settings: &Settings, probe: bool) -> Result<()> {
    let policy = if probe {
        DiscoveryPolicy::ProbeOpenable
    } else {
        settings.discovery
    };
    let ports = discover_ports(policy);
    if ports.is_empty() {
        println!("No active COM ports found.");
    }
    for port in &ports {
        println!("{}", describe_port(port));
    }
    Ok(())
}

fn print_snapshot(snapshot: &PortSnapshot) {
    let names: Vec<String> = snapshot.ports.iter().map(describe_port).collect();
    println!(
        "[{}] ports: {}",
        Local::now().format("%H:%M:%S"),
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    );
    match snapshot.removable_drives.first() {
        Some(drive) => println!("USB Detected: {}", drive.display()),
        None => println!("No USB detected"),
    }
}

pub async fn watch(settings: &Settings, interval: Option<u64>) -> Result<()> {
    let interval = interval
        .map(|s| Duration::from_secs(s.max(1)))
        .unwrap_or_else(|| settings.watch_interval());
    let watcher = PortWatcher::spawn(settings.discovery, interval);
    let mut rx = watcher.subscribe();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                print_snapshot(&snapshot);
            }
        }
    }
    watcher.stop();
    Ok(())
}

/// Options for [`log`]
pub struct LogOptions {
    pub port: Option<String>,
    pub demo: Option<Duration>,
    pub baud: Option<u32>,
    pub download: bool,
    pub count: Option<usize>,
    pub outputs: Vec<PathBuf>,
}

pub async fn log(mut settings: Settings, config_path: &Path, opts: LogOptions) -> Result<()> {
    if let Some(baud) = opts.baud {
        settings.baud_rate = baud;
    }
    let mut session = Session::new(settings.clone());
    session.set_record_events(true);

    match opts.demo {
        Some(interval) => {
            session
                .connect_channel(DEMO_PORT_NAME, Box::new(DemoDevice::new(interval)))
                .context("starting demo device")?;
        }
        None => {
            match opts.port {
                Some(port) => session.select_port(port),
                None if session.selected_port().is_none() => {
                    session.refresh_ports();
                }
                None => {}
            }
            session.connect().context("connecting to datalogger")?;

            if let Some(port) = session.selected_port() {
                settings.port = Some(port.to_string());
                if let Err(e) = settings.save(config_path) {
                    warn!("could not remember port in {}: {e}", config_path.display());
                }
            }
        }
    }
    println!("{}", session.status());

    if opts.download {
        session.download().context("requesting download")?;
        println!("{}", session.status());
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut received = 0usize;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = session.next_event() => match event {
                Some(IngestEvent::Record(record)) => {
                    received += 1;
                    println!("{}", describe_record(&record));
                    if opts.count.is_some_and(|n| received >= n) {
                        break;
                    }
                }
                Some(IngestEvent::ConnectionLost { .. }) => {
                    eprintln!("{}", session.status());
                    break;
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    session.disconnect();
    info!("captured {} records", session.store().len());

    for path in &opts.outputs {
        let format = session
            .save_as(path)
            .with_context(|| format!("saving {}", path.display()))?;
        println!("{format} file saved to {}", path.display());
    }
    if opts.outputs.is_empty() && !session.store().is_empty() {
        println!(
            "{} records captured; pass --output (e.g. {}) to save them",
            session.store().len(),
            generate_filename(&Local::now(), ExportFormat::Csv)
        );
    }
    Ok(())
}

fn load_records(input: &Path, skip: usize) -> Result<Vec<Record>> {
    let records =
        import_csv(input, skip).with_context(|| format!("reading {}", input.display()))?;
    if records.is_empty() {
        bail!("No valid data found in {}", input.display());
    }
    Ok(records)
}

pub fn convert(input: &Path, skip: usize, outputs: &[PathBuf]) -> Result<()> {
    let records = load_records(input, skip)?;
    for path in outputs {
        let format = export::export_auto(&records, path)
            .with_context(|| format!("saving {}", path.display()))?;
        println!(
            "{format} file saved to {} ({} records)",
            path.display(),
            records.len()
        );
    }
    Ok(())
}

pub fn stats(input: &Path, skip: usize) -> Result<()> {
    let records = load_records(input, skip)?;
    let series = TemperatureSeries::from_records(&records);

    println!("records:   {}", records.len());
    match series.summary() {
        Some(summary) => {
            println!("numeric:   {}", summary.count);
            println!("min:       {:.2}", summary.min);
            println!("max:       {:.2}", summary.max);
            println!("latest:    {:.2}", summary.latest);
        }
        None => println!("no numeric temperatures"),
    }
    if let (Some(first), Some(last)) = (series.labels.first(), series.labels.last()) {
        println!("span:      {first} .. {last}");
    }
    Ok(())
}
