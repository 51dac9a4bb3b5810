//! Scan timing configuration.
//!
//! Defaults follow broadcast SI repetition periods: terrestrial tables
//! repeat within 2 seconds, BS/CS tables within 10, so captures are sized
//! just past those. Everything can be overridden from `isdbscan.toml`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Timing knobs for probing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Capture length for terrestrial channels (seconds).
    pub terrestrial_recording_secs: f64,
    /// Capture length for satellite channels (seconds).
    pub satellite_recording_secs: f64,
    /// How long a probe may wait for the tuner to start streaming before
    /// the channel is treated as not receivable (seconds).
    pub lock_timeout_secs: f64,
    /// Delay between attempts to acquire a tuner when every matching one
    /// is in use (milliseconds).
    pub acquire_retry_interval_ms: u64,
    /// Acquisition attempts before a target is skipped.
    pub acquire_max_attempts: u32,
    /// Signal-level samples averaged into one quality reading.
    pub signal_samples: u32,
    /// Concurrent probes; 0 means one per enumerated tuner.
    pub max_concurrent_probes: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            terrestrial_recording_secs: 2.25,
            satellite_recording_secs: 11.0,
            lock_timeout_secs: 7.0,
            acquire_retry_interval_ms: 500,
            acquire_max_attempts: 20,
            signal_samples: 5,
            max_concurrent_probes: 0,
        }
    }
}

impl ScanConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.lock_timeout_secs)
    }

    pub fn acquire_retry_interval(&self) -> Duration {
        Duration::from_millis(self.acquire_retry_interval_ms)
    }

    /// Capture length for a terrestrial or satellite target.
    pub fn recording_secs(&self, satellite: bool) -> f64 {
        if satellite {
            self.satellite_recording_secs
        } else {
            self.terrestrial_recording_secs
        }
    }
}

/// `isdbscan.toml` layout.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Load the configuration file, if present.
pub fn load_config(path: &Path) -> Result<ConfigFile, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.terrestrial_recording_secs, 2.25);
        assert_eq!(config.satellite_recording_secs, 11.0);
        assert_eq!(config.lock_timeout_secs, 7.0);
        assert_eq!(config.acquire_max_attempts, 20);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: ConfigFile = toml::from_str(
            "[scan]\nlock_timeout_secs = 10.0\nmax_concurrent_probes = 2\n",
        )
        .unwrap();
        assert_eq!(parsed.scan.lock_timeout_secs, 10.0);
        assert_eq!(parsed.scan.max_concurrent_probes, 2);
        assert_eq!(parsed.scan.terrestrial_recording_secs, 2.25);
    }
}
