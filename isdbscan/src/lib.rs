//! isdbscan: channel scanner for Japanese ISDB-T/ISDB-S broadcasts.
//!
//! The scanner probes every terrestrial physical channel plus one
//! representative channel per satellite network, decodes the NIT/SDT
//! carried in each capture, and reconciles the detections into a single
//! deduplicated channel registry that the exporters turn into
//! `Channels.json` and EDCB channel-set files.
//!
//! Physical reception is delegated to the external `recisdb` command; see
//! [`tuner::recisdb`] for that boundary.

pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod scan;
pub mod ts;
pub mod tuner;
