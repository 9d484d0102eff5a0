// src/main.rs
//! gga-fix - read GPGGA fixes from a serial GPS receiver

use anyhow::Context;
use clap::Parser;
use gga_fix::{
    config::{parse_reference, ReceiverConfig},
    report::{self, FixReport},
    FixMonitor,
};
use std::io;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gga-fix", version, about = "Read GPGGA fixes from a serial GPS receiver")]
struct Args {
    /// Serial device path
    #[arg(short, long)]
    device: Option<String>,

    /// Baud rate (2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Read in raw chunks of N bytes instead of canonical lines
    #[arg(long, value_name = "N")]
    raw: Option<usize>,

    /// Give up on a read after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Number of fixes to read; 0 reads until interrupted
    #[arg(short, long, default_value_t = 1)]
    count: u64,

    /// Reference point for distance and bearing, as LAT,LON
    #[arg(short, long, value_name = "LAT,LON", allow_hyphen_values = true)]
    reference: Option<String>,

    /// Print one JSON object per fix instead of the text report
    #[arg(long)]
    json: bool,

    /// Send a sentence to the receiver before reading (checksum is appended)
    #[arg(long, value_name = "SENTENCE")]
    send: Option<String>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Save the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_ports {
        return list_serial_ports();
    }

    let config = effective_config(&args)?;
    if args.save_config {
        config.save().context("Failed to save configuration")?;
        tracing::info!("Saved configuration to {}", ReceiverConfig::get_config_path()?.display());
    }

    let serial_config = config.serial_config();
    tracing::info!(
        "Reading GGA fixes from {} at {} baud",
        serial_config.device_path(),
        serial_config.baud_rate()
    );

    let mut monitor = FixMonitor::open(serial_config).context("Failed to open GPS receiver")?;
    let close = monitor.close_handle();

    let interrupt = close.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.close();
        }
    });

    if let Some(sentence) = &args.send {
        monitor
            .send_sentence(sentence)
            .await
            .context("Failed to send sentence")?;
    }

    let reference = config.reference();
    let mut received = 0u64;
    while args.count == 0 || received < args.count {
        let fix = match monitor.next_fix().await {
            Ok(fix) => fix,
            Err(_) if close.is_closed() => {
                tracing::info!("Interrupted");
                break;
            }
            Err(e) => return Err(e).context("Failed to read fix"),
        };
        received += 1;

        let fix_report = FixReport::new(fix, reference);
        if args.json {
            println!("{}", fix_report.to_json()?);
        } else {
            report::render_text(&mut io::stdout(), &fix_report)?;
        }
    }

    tracing::debug!(
        "{} fixes, {} lines skipped, {} sentences discarded",
        received,
        monitor.skipped(),
        monitor.discarded()
    );
    monitor.close().context("Failed to close GPS receiver")?;

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Config file values, overridden by command line flags
fn effective_config(args: &Args) -> anyhow::Result<ReceiverConfig> {
    let mut config = ReceiverConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Ignoring saved configuration: {}", e);
        ReceiverConfig::default()
    });

    if let Some(device) = &args.device {
        config.device_path = device.clone();
    }
    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }
    if let Some(size) = args.raw {
        config.canonical = false;
        config.raw_read_size = size;
    }
    if let Some(ms) = args.timeout_ms {
        config.read_timeout_ms = Some(ms);
    }
    if let Some(reference) = &args.reference {
        config.update_reference(parse_reference(reference).context("Invalid --reference")?);
    }

    Ok(config)
}

fn list_serial_ports() -> anyhow::Result<()> {
    let ports = tokio_serial::available_ports().context("Failed to list serial ports")?;

    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {} - {:?}", port.port_name, port.port_type);
        }
    }

    Ok(())
}
