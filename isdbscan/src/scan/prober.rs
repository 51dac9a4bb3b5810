//! Probing one scan target end to end.
//!
//! A probe acquires a tuner of the right capability (retrying with backoff
//! while every matching tuner is leased), drives the tuning collaborator,
//! and absorbs all per-target failures: a channel that cannot be locked
//! simply contributes no services. The tuner lease is dropped on every
//! exit path, cancellation included.

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use std::sync::Arc;

use isdbscan_model::LnbVoltage;

use super::planner::ScanTarget;
use crate::config::ScanConfig;
use crate::tuner::{TuneBackend, TuneError, TunedCapture, TunerPool};

/// What became of one target.
#[derive(Debug)]
pub enum ProbeStatus {
    /// Locked and analyzed.
    Scanned(TunedCapture),
    /// Lock failed or produced nothing usable; the reason is diagnostic.
    Empty(TuneError),
    /// No capable tuner became free within the retry budget.
    Skipped,
    /// The scan was cancelled while this probe was in flight.
    Cancelled,
}

/// One probed target with its result.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub target: ScanTarget,
    pub status: ProbeStatus,
}

/// Executes probes against the tuner pool.
pub struct ChannelProber<B> {
    pool: Arc<TunerPool>,
    backend: Arc<B>,
    config: ScanConfig,
    lnb: LnbVoltage,
    cancel: CancellationToken,
}

impl<B: TuneBackend> ChannelProber<B> {
    pub fn new(
        pool: Arc<TunerPool>,
        backend: Arc<B>,
        config: ScanConfig,
        lnb: LnbVoltage,
        cancel: CancellationToken,
    ) -> Self {
        Self { pool, backend, config, lnb, cancel }
    }

    /// Probe one target. Never fails the scan: every error is folded into
    /// the returned status.
    pub async fn probe(&self, target: ScanTarget) -> ProbeOutcome {
        let status = self.probe_inner(&target).await;
        ProbeOutcome { target, status }
    }

    async fn probe_inner(&self, target: &ScanTarget) -> ProbeStatus {
        let kind = target.kind();
        let channel = target.physical_channel;

        for attempt in 1..=self.config.acquire_max_attempts {
            if self.cancel.is_cancelled() {
                return ProbeStatus::Cancelled;
            }

            let Some(mut lease) = self.pool.try_acquire(kind) else {
                debug!(
                    "{channel}: no free {kind} tuner (attempt {attempt}/{})",
                    self.config.acquire_max_attempts
                );
                // A tuner may free up as other probes finish; wait briefly
                // instead of blocking on the pool.
                tokio::select! {
                    _ = tokio::time::sleep(self.config.acquire_retry_interval()) => continue,
                    _ = self.cancel.cancelled() => return ProbeStatus::Cancelled,
                }
            };

            info!("{channel}: probing on {}", lease.device().name);
            let tuned = tokio::select! {
                result = self.backend.tune(
                    lease.device(),
                    channel,
                    self.lnb,
                    self.config.recording_secs(kind.is_satellite()),
                    self.config.lock_timeout(),
                ) => result,
                _ = self.cancel.cancelled() => {
                    info!("{channel}: cancelled mid-probe");
                    return ProbeStatus::Cancelled;
                }
            };

            match tuned {
                Ok(capture) => {
                    info!(
                        "{channel}: locked, signal {:.2} dB, {} NIT / {} SDT sections",
                        capture.signal_quality,
                        capture.tables.nit.len(),
                        capture.tables.sdt.len()
                    );
                    return ProbeStatus::Scanned(capture);
                }
                Err(TuneError::Opening(message)) => {
                    // The device is at fault; disable it and try another.
                    warn!("{channel}: tuner open failed: {message}");
                    lease.mark_failed();
                    continue;
                }
                Err(e) => {
                    info!("{channel}: not receivable ({e})");
                    return ProbeStatus::Empty(e);
                }
            }
        }

        warn!(
            "{channel}: skipped after {} acquisition attempts",
            self.config.acquire_max_attempts
        );
        ProbeStatus::Skipped
    }
}
