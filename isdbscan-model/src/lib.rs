//! Domain model for the ISDB channel scanner.
//!
//! This crate defines the types a scan produces and consumes:
//!
//! - [`BroadcastKind`]: Terrestrial / BS / CS1 / CS2 classification
//! - [`PhysicalChannel`]: typed physical-channel selector (`T13`,
//!   `BS01/TS0`, `ND04`) with the spelling the external tuning tool accepts
//! - [`TransportStreamInfo`] / [`ServiceInfo`]: one physical emission and
//!   the receivable channels it carries
//! - [`ChannelRegistry`]: the deduplicated result of a whole scan, keyed by
//!   (network id, transport-stream id, service id)
//!
//! Everything here is plain data; tuner control and table decoding live in
//! the scanner binary.

pub mod channel;
pub mod registry;
pub mod types;

pub use channel::{BroadcastKind, LnbVoltage, ParseSelectorError, PhysicalChannel};
pub use registry::{BandStreams, ChannelRegistry, ServiceKey};
pub use types::{service_type, ServiceClass, ServiceInfo, TransportStreamInfo};
