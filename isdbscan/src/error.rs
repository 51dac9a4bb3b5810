//! Run-level error taxonomy.
//!
//! Per-target failures (lock timeouts, decode problems, a momentarily
//! exhausted tuner pool) are absorbed inside the scan loop and never reach
//! this level; only conditions that make the whole run impossible do.

use thiserror::Error;

/// Errors that abort a scan run.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Device enumeration came back empty: nothing can be probed at all.
    #[error("no tuner devices detected")]
    NoTunersDetected,

    /// Device enumeration itself failed.
    #[error("tuner enumeration failed: {0}")]
    Enumeration(#[from] std::io::Error),
}
