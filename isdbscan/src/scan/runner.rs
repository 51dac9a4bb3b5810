//! Whole-scan orchestration.
//!
//! Probes run with bounded concurrency (at most one per usable tuner by
//! default), results are interpreted as they complete, and merging into
//! the registry stays on this task so the deduplication engine never sees
//! concurrent writers.

use std::sync::Arc;

use futures::{stream, StreamExt};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use isdbscan_model::{BroadcastKind, ChannelRegistry, LnbVoltage};

use super::interpret::interpret;
use super::planner::{plan, ScanTarget};
use super::prober::{ChannelProber, ProbeStatus};
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::tuner::{DeviceEnumerator, TuneBackend, TunerPool};

/// Options mapped from the CLI.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub exclude_pay_tv: bool,
    pub lnb: LnbVoltage,
}

/// Run a full scan and return the registry.
///
/// Fails only when no tuner exists at all; everything else degrades to a
/// partial (possibly empty) registry. Cancellation stops dispatch and
/// returns whatever was merged so far.
pub async fn run_scan<E, B>(
    enumerator: &E,
    backend: Arc<B>,
    config: ScanConfig,
    options: ScanOptions,
    cancel: CancellationToken,
) -> Result<ChannelRegistry, ScanError>
where
    E: DeviceEnumerator,
    B: TuneBackend,
{
    let devices = enumerator.enumerate()?;
    if devices.is_empty() {
        return Err(ScanError::NoTunersDetected);
    }
    for device in &devices {
        info!(
            "found tuner: [{}] {} ({}){}",
            device.capability,
            device.name,
            device.path.display(),
            if device.busy { " (busy)" } else { "" }
        );
    }

    let pool = Arc::new(TunerPool::new(devices));
    let targets = plan(!options.exclude_pay_tv);

    // Targets for which no tuner exists at all are dropped up front; the
    // per-target retry loop is for transient scarcity only.
    let (runnable, unservable): (Vec<ScanTarget>, Vec<ScanTarget>) = targets
        .into_iter()
        .partition(|t| pool.supports(t.kind()));
    if !unservable.is_empty() {
        let kinds: Vec<&str> = {
            let mut kinds: Vec<&str> =
                unservable.iter().map(|t| t.kind().name()).collect();
            kinds.dedup();
            kinds
        };
        warn!(
            "no capable tuner for {}; skipping {} target(s)",
            kinds.join("/"),
            unservable.len()
        );
    }

    let concurrency = if config.max_concurrent_probes == 0 {
        pool.usable_count().max(1)
    } else {
        config.max_concurrent_probes
    };
    info!(
        "scanning {} target(s), up to {} concurrent probe(s)",
        runnable.len(),
        concurrency
    );

    let prober = ChannelProber::new(
        Arc::clone(&pool),
        backend,
        config,
        options.lnb,
        cancel.clone(),
    );

    let mut registry = ChannelRegistry::new();
    let mut scanned = 0usize;
    let mut unreceived = 0usize;
    let mut skipped = 0usize;
    let mut was_cancelled = false;

    let mut outcomes =
        stream::iter(runnable.into_iter().map(|target| prober.probe(target)))
            .buffer_unordered(concurrency);
    while let Some(outcome) = outcomes.next().await {
        match outcome.status {
            ProbeStatus::Scanned(capture) => {
                scanned += 1;
                let streams = interpret(&outcome.target, &capture.tables);
                if streams.is_empty() {
                    info!("{}: locked but no channels decoded", outcome.target.physical_channel);
                }
                for ts in streams {
                    info!(
                        "  {} - {} / TSID 0x{:04X} | {} ({} services)",
                        ts.broadcast_kind(),
                        ts.physical_channel,
                        ts.transport_stream_id,
                        ts.network_name,
                        ts.services.len()
                    );
                    for service in &ts.services {
                        info!(
                            "    ch {} | SID {:5} | {}{}{}",
                            service.channel_number,
                            service.service_id,
                            service.service_name,
                            if service.is_free { "" } else { " [Pay TV]" },
                            if service.is_oneseg { " [OneSeg]" } else { "" }
                        );
                    }
                    registry.merge(ts, capture.signal_quality);
                }
            }
            ProbeStatus::Empty(_) => unreceived += 1,
            ProbeStatus::Skipped => skipped += 1,
            ProbeStatus::Cancelled => was_cancelled = true,
        }
    }
    drop(outcomes);

    if was_cancelled {
        warn!("scan cancelled; exporting partial results");
    }
    log_summary(&registry, scanned, unreceived, skipped);

    Ok(registry)
}

fn log_summary(registry: &ChannelRegistry, scanned: usize, unreceived: usize, skipped: usize) {
    info!("==== scan summary ====");
    info!(
        "targets: {scanned} locked, {unreceived} not received, {skipped} skipped"
    );
    for kind in [
        BroadcastKind::Terrestrial,
        BroadcastKind::Bs,
        BroadcastKind::Cs1,
        BroadcastKind::Cs2,
    ] {
        let streams = registry.streams_of(kind);
        if streams.is_empty() {
            continue;
        }
        let services: usize = streams.iter().map(|s| s.services.len()).sum();
        info!("  {kind}: {} transport stream(s), {services} service(s)", streams.len());
    }
    info!("======================");
}
