//! Tuner devices, allocation, and the external tuning collaborator.
//!
//! - [`device`]: chardev tuner enumeration and busy detection
//! - [`pool`]: free/busy allocation with RAII leases
//! - [`recisdb`]: driving the external `recisdb` process to lock a channel,
//!   capture a transport stream, and measure signal quality

pub mod device;
pub mod pool;
pub mod recisdb;

pub use device::{ChardevEnumerator, DeviceEnumerator, TunerCapability, TunerDevice};
pub use pool::{TunerLease, TunerPool};
pub use recisdb::{RecisdbBackend, TuneBackend, TuneError, TunedCapture};
