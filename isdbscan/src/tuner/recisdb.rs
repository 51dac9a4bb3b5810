//! The external tuning collaborator.
//!
//! Physical reception is delegated to the `recisdb` command: `tune` locks
//! a channel and streams the transport stream to stdout for a fixed time,
//! `checksignal` reports the signal level once per line. This module wraps
//! both behind [`TuneBackend`] with bounded waits everywhere; a probe can
//! be slow, but it can never hang.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use log::{debug, info, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};

use isdbscan_model::{LnbVoltage, PhysicalChannel};

use super::device::TunerDevice;
use crate::ts::{DecodedTables, SectionDemux};

/// A successful lock produces at least this much data even on a quiet
/// multiplex; anything less means the channel was not really received.
pub const MIN_CAPTURE_BYTES: usize = 100 * 1024;

/// Placeholder quality for a locked channel whose level could not be
/// measured. Low enough that any real measurement beats it.
pub const SIGNAL_UNMEASURED: f64 = -99.99;

/// Failures of a single tuning attempt.
#[derive(Debug, Error)]
pub enum TuneError {
    /// The tuner device could not be opened; the device is at fault, not
    /// the channel, so the caller should retry on another tuner.
    #[error("failed to open tuner: {0}")]
    Opening(String),

    /// The channel could not be selected or received.
    #[error("channel selection failed: {0}")]
    Tuning(String),

    /// No transport stream arrived within the lock timeout.
    #[error("channel selection timed out")]
    LockTimeout,

    /// The capture was too small to have been a real lock.
    #[error("tuner output too small ({0} bytes)")]
    Output(usize),

    /// Process plumbing failed.
    #[error("tuner process I/O: {0}")]
    Io(#[from] io::Error),
}

/// Result of one successful probe: decoded tables plus the measured
/// signal quality in dB.
#[derive(Debug)]
pub struct TunedCapture {
    pub tables: DecodedTables,
    pub signal_quality: f64,
    pub captured_bytes: usize,
}

/// Capability interface the prober depends on.
#[async_trait]
pub trait TuneBackend: Send + Sync {
    /// Lock `channel` on `device`, capture for `recording_secs`, and
    /// return the decoded tables plus a signal-quality measurement.
    /// Satellite channels are tuned with the given LNB supply.
    async fn tune(
        &self,
        device: &TunerDevice,
        channel: PhysicalChannel,
        lnb: LnbVoltage,
        recording_secs: f64,
        lock_timeout: Duration,
    ) -> Result<TunedCapture, TuneError>;
}

/// Drives the real `recisdb` executable.
pub struct RecisdbBackend {
    command: String,
    forward_log: bool,
    signal_samples: u32,
}

impl RecisdbBackend {
    pub fn new(forward_log: bool, signal_samples: u32) -> Self {
        Self {
            command: "recisdb".to_string(),
            forward_log,
            signal_samples: signal_samples.max(1),
        }
    }

    /// Whether the external command can be executed at all.
    pub fn is_available() -> bool {
        std::process::Command::new("recisdb")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    async fn measure_signal(
        &self,
        device: &TunerDevice,
        channel: PhysicalChannel,
        lnb: LnbVoltage,
        deadline: Duration,
    ) -> Result<f64, TuneError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("checksignal")
            .arg("--device")
            .arg(&device.path)
            .arg("--channel")
            .arg(channel.tuner_arg());
        if channel.kind().is_satellite() {
            cmd.args(["--lnb", lnb.as_arg()]);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::null());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout pipe missing"))?;

        let samples = self.signal_samples as usize;
        let sampled = tokio::time::timeout(deadline, async {
            let mut levels = Vec::with_capacity(samples);
            let mut line = String::new();
            let mut buffer = [0u8; 256];
            'read: loop {
                let n = stdout.read(&mut buffer).await?;
                if n == 0 {
                    break;
                }
                for &byte in &buffer[..n] {
                    if byte == b'\r' || byte == b'\n' {
                        if let Some(level) = parse_signal_level(&line) {
                            levels.push(level);
                            if levels.len() >= samples {
                                break 'read;
                            }
                        }
                        line.clear();
                    } else {
                        line.push(byte as char);
                    }
                }
            }
            Ok::<_, io::Error>(levels)
        })
        .await;

        interrupt(&mut child).await;

        let levels = match sampled {
            Ok(Ok(levels)) => levels,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(TuneError::LockTimeout),
        };
        if levels.is_empty() {
            return Err(TuneError::Output(0));
        }
        Ok(levels.iter().sum::<f64>() / levels.len() as f64)
    }
}

#[async_trait]
impl TuneBackend for RecisdbBackend {
    async fn tune(
        &self,
        device: &TunerDevice,
        channel: PhysicalChannel,
        lnb: LnbVoltage,
        recording_secs: f64,
        lock_timeout: Duration,
    ) -> Result<TunedCapture, TuneError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("tune")
            .arg("--device")
            .arg(&device.path)
            .arg("--channel")
            .arg(channel.tuner_arg())
            .arg("--time")
            .arg(format!("{recording_secs}"));
        if channel.kind().is_satellite() {
            cmd.args(["--lnb", lnb.as_arg()]);
        }
        cmd.arg("-");
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout pipe missing"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("stderr pipe missing"))?;

        let forward = self.forward_log;
        let stderr_task = tokio::spawn(async move {
            let mut collected = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if forward {
                    info!("recisdb: {line}");
                } else {
                    debug!("recisdb: {line}");
                }
                collected.push_str(&line);
                collected.push('\n');
            }
            collected
        });

        // The lock timeout only runs until the first byte arrives; once the
        // stream flows, recisdb itself bounds the capture via --time.
        let mut capture = BytesMut::with_capacity(MIN_CAPTURE_BYTES);
        let mut buffer = vec![0u8; 188 * 1024];
        match tokio::time::timeout(lock_timeout, stdout.read(&mut buffer)).await {
            Err(_) => {
                interrupt(&mut child).await;
                let _ = stderr_task.await;
                return Err(TuneError::LockTimeout);
            }
            Ok(read) => {
                let n = read?;
                capture.extend_from_slice(&buffer[..n]);
            }
        }
        loop {
            let n = stdout.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            capture.extend_from_slice(&buffer[..n]);
        }

        let status = child.wait().await?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let message = extract_error_message(&stderr_text);
            if is_opening_error(&message) {
                return Err(TuneError::Opening(message));
            }
            return Err(TuneError::Tuning(message));
        }
        if capture.len() < MIN_CAPTURE_BYTES {
            return Err(TuneError::Output(capture.len()));
        }

        let mut demux = SectionDemux::new();
        demux.feed(&capture);
        let packets = demux.packets_processed();
        let tables = demux.into_tables();
        debug!(
            "{channel}: {} bytes captured, {packets} packets, {} NIT / {} SDT sections",
            capture.len(),
            tables.nit.len(),
            tables.sdt.len()
        );

        let measure_deadline = lock_timeout + Duration::from_secs(5);
        let signal_quality = match self
            .measure_signal(device, channel, lnb, measure_deadline)
            .await
        {
            Ok(level) => level,
            Err(e) => {
                warn!("signal measurement failed on {channel}: {e}");
                SIGNAL_UNMEASURED
            }
        };

        Ok(TunedCapture {
            tables,
            signal_quality,
            captured_bytes: capture.len(),
        })
    }
}

/// Interrupt the child so the driver closes the device cleanly, then reap
/// it. A plain kill can leave the tuner busy for the next probe.
async fn interrupt(child: &mut Child) {
    if let Some(id) = child.id() {
        let _ = kill(Pid::from_raw(id as i32), Signal::SIGINT);
    }
    let _ = child.wait().await;
}

/// Pull the `ERROR: ...` line out of collected stderr.
fn extract_error_message(stderr_text: &str) -> String {
    stderr_text
        .lines()
        .find_map(|line| line.split_once("ERROR:").map(|(_, m)| m.trim().to_string()))
        .unwrap_or_else(|| "Channel selection failed due to an unknown error.".to_string())
}

/// Messages recisdb emits when the device itself could not be opened, as
/// opposed to the channel not being receivable.
fn is_opening_error(message: &str) -> bool {
    message.starts_with("Cannot open the device.")
        || matches!(
            message,
            "The tuner device does not exist."
                | "The tuner device is already in use."
                | "The tuner device is busy."
                | "The tuner device does not support the ioctl system call."
        )
}

/// Parse one `checksignal` line like `30.25dB`.
fn parse_signal_level(line: &str) -> Option<f64> {
    let end = line.find("dB")?;
    let start = line[..end]
        .rfind(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|p| p + 1)
        .unwrap_or(0);
    line[start..end].parse().ok()
}
