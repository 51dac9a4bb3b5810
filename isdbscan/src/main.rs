//! isdbscan: scan Japanese ISDB-T/ISDB-S broadcast channels and write the
//! results as JSON and EDCB channel-set files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use isdbscan::config::{self, ConfigFile};
use isdbscan::export;
use isdbscan::logging;
use isdbscan::scan::{run_scan, ScanOptions};
use isdbscan::tuner::{
    ChardevEnumerator, DeviceEnumerator, RecisdbBackend, TunerCapability,
};
use isdbscan_model::LnbVoltage;

/// Scans Japanese ISDB-T/ISDB-S broadcast channels and writes the results
/// in multiple formats (depends on recisdb).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output scan results to the specified directory
    #[arg(default_value = "scanned/")]
    output: PathBuf,

    /// Exclude pay-TV channels from the channel-set outputs and skip the
    /// CS networks entirely
    #[arg(long)]
    exclude_pay_tv: bool,

    /// Forward the tuning tool's log output
    #[arg(long)]
    output_tuner_log: bool,

    /// List available tuner devices and exit
    #[arg(long)]
    list_tuners: bool,

    /// LNB voltage for satellite antenna power supply (low/11v/15v)
    #[arg(long, default_value = "low")]
    lnb: LnbVoltage,

    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config file: explicit path > auto-detect > defaults
    let config_path = args.config.clone().or_else(|| {
        let default_path = PathBuf::from("isdbscan.toml");
        default_path.exists().then_some(default_path)
    });
    let file_config = if let Some(config_path) = &config_path {
        match config::load_config(config_path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", config_path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {e}");
                return Err(e);
            }
        }
    } else {
        ConfigFile::default()
    };
    let scan_config = file_config.scan;

    logging::init_logging(args.verbose)?;

    if args.list_tuners {
        list_tuners()?;
        return Ok(());
    }

    if !RecisdbBackend::is_available() {
        error!("recisdb not found; install recisdb and try again");
        return Err("recisdb not found".into());
    }

    let started = Instant::now();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; finishing with partial results");
                cancel.cancel();
            }
        });
    }

    let backend = Arc::new(RecisdbBackend::new(
        args.output_tuner_log,
        scan_config.signal_samples,
    ));
    let options = ScanOptions {
        exclude_pay_tv: args.exclude_pay_tv,
        lnb: args.lnb,
    };

    let registry = match run_scan(
        &ChardevEnumerator,
        backend,
        scan_config,
        options,
        cancel,
    )
    .await
    {
        Ok(registry) => registry,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };

    export::write_all(&args.output, &registry, args.exclude_pay_tv)?;

    info!(
        "finished in {:.2} seconds ({} services registered)",
        started.elapsed().as_secs_f64(),
        registry.service_count()
    );
    Ok(())
}

fn list_tuners() -> Result<(), Box<dyn std::error::Error>> {
    let devices = ChardevEnumerator.enumerate()?;
    for (capability, heading) in [
        (TunerCapability::Terrestrial, "Available ISDB-T tuners:"),
        (TunerCapability::Satellite, "Available ISDB-S tuners:"),
        (TunerCapability::Multi, "Available ISDB-T/ISDB-S multi tuners:"),
    ] {
        println!("{heading}");
        for device in devices.iter().filter(|d| d.capability == capability) {
            println!(
                "  {} ({}){}",
                device.name,
                device.path.display(),
                if device.busy { " (Busy)" } else { "" }
            );
        }
    }
    Ok(())
}
