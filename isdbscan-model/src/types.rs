//! Transport stream and service records produced by a scan.

use serde::{Deserialize, Serialize};

use crate::channel::{BroadcastKind, PhysicalChannel};

/// ARIB service-type codes relevant to channel enumeration
/// (ARIB STD-B10 第2部 付録H).
pub mod service_type {
    /// Digital TV service.
    pub const DIGITAL_TV: u8 = 0x01;
    /// Digital audio (radio) service.
    pub const DIGITAL_AUDIO: u8 = 0x02;
    /// Temporary video service.
    pub const TEMPORARY_VIDEO: u8 = 0xA1;
    /// Temporary audio service.
    pub const TEMPORARY_AUDIO: u8 = 0xA2;
    /// Temporary data service.
    pub const TEMPORARY_DATA: u8 = 0xA3;
    /// Engineering (download) service.
    pub const ENGINEERING: u8 = 0xA4;
    /// Promotion video service.
    pub const PROMOTION_VIDEO: u8 = 0xA5;
    /// Promotion audio service.
    pub const PROMOTION_AUDIO: u8 = 0xA6;
    /// Promotion data service.
    pub const PROMOTION_DATA: u8 = 0xA7;
    /// Advanced 4K TV service.
    pub const UHD_TV: u8 = 0xAD;
    /// Data service (includes one-seg transmissions).
    pub const DATA: u8 = 0xC0;

    /// Whether a service of this type is receivable content worth listing.
    /// Engineering/download services and unknown codes are not.
    pub fn is_receivable_content(code: u8) -> bool {
        matches!(
            code,
            DIGITAL_TV
                | DIGITAL_AUDIO
                | TEMPORARY_VIDEO
                | TEMPORARY_AUDIO
                | TEMPORARY_DATA
                | PROMOTION_VIDEO
                | PROMOTION_AUDIO
                | PROMOTION_DATA
                | UHD_TV
                | DATA
        )
    }

    /// Whether this type is a video service for viewer-facing channel
    /// lists (the classification EDCB uses for its view flag).
    pub fn is_video(code: u8) -> bool {
        matches!(code, DIGITAL_TV | PROMOTION_VIDEO | UHD_TV)
    }
}

/// Coarse classification of a service-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceClass {
    /// Regular or temporary/promotion television.
    Television,
    /// Audio-only broadcasting.
    Radio,
    /// Data broadcasting (one-seg included).
    Data,
    /// Anything else, engineering services included.
    Other,
}

impl ServiceClass {
    /// Classify an ARIB service-type code.
    pub fn of(code: u8) -> Self {
        use service_type::*;
        match code {
            DIGITAL_TV | TEMPORARY_VIDEO | PROMOTION_VIDEO | UHD_TV => ServiceClass::Television,
            DIGITAL_AUDIO | TEMPORARY_AUDIO | PROMOTION_AUDIO => ServiceClass::Radio,
            TEMPORARY_DATA | PROMOTION_DATA | DATA => ServiceClass::Data,
            _ => ServiceClass::Other,
        }
    }
}

/// One receivable channel within a transport stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Three-digit channel number (equals the service ID on BS/CS).
    pub channel_number: String,
    /// Service ID.
    pub service_id: u16,
    /// ARIB service-type code.
    pub service_type: u8,
    /// Service name from the SDT.
    pub service_name: String,
    /// Free-to-air flag; pay TV is `!is_free`, derived solely from the SDT
    /// `free_CA_mode` bit.
    pub is_free: bool,
    /// One-seg (partial reception) service.
    pub is_oneseg: bool,
}

/// One physical emission and the services it carries.
///
/// Identity is (network id, transport-stream id); terrestrial TSIDs are
/// nationally unique per station, which is what makes relay-duplicate
/// detection by TSID sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportStreamInfo {
    /// Physical channel the stream was (or can be) received on.
    pub physical_channel: PhysicalChannel,
    /// Transport stream ID.
    pub transport_stream_id: u16,
    /// Network ID.
    pub network_id: u16,
    /// Terrestrial: TS name; satellite: network name.
    pub network_name: String,
    /// Remote-control key ID (terrestrial only).
    pub remote_control_key_id: Option<u8>,
    /// Downlink frequency in GHz (satellite only).
    pub satellite_frequency: Option<f64>,
    /// Transponder number (satellite only).
    pub satellite_transponder: Option<u8>,
    /// Relative TS number within the transponder (BS only).
    pub satellite_slot_number: Option<u8>,
    /// Services carried on this stream, sorted by service ID.
    pub services: Vec<ServiceInfo>,
}

impl TransportStreamInfo {
    /// New record with no services attached yet.
    pub fn new(network_id: u16, transport_stream_id: u16, physical_channel: PhysicalChannel) -> Self {
        Self {
            physical_channel,
            transport_stream_id,
            network_id,
            network_name: String::new(),
            remote_control_key_id: None,
            satellite_frequency: None,
            satellite_transponder: None,
            satellite_slot_number: None,
            services: Vec::new(),
        }
    }

    /// Registry identity of this stream.
    pub fn key(&self) -> (u16, u16) {
        (self.network_id, self.transport_stream_id)
    }

    /// Band classification: by network ID where assigned, by physical
    /// channel otherwise.
    pub fn broadcast_kind(&self) -> BroadcastKind {
        BroadcastKind::from_network_id(self.network_id)
            .unwrap_or_else(|| self.physical_channel.kind())
    }
}

/// Compute the three-digit channel number of a terrestrial service.
///
/// Terrestrial SIDs pack (region, prefecture-complement flag, service
/// class, operator, service number) per ARIB TR-B14 第五分冊 第七編 9.1;
/// the on-screen number is
/// `class * 200 + remote_control_key_id * 10 + service_number + 1`.
pub fn terrestrial_channel_number(service_id: u16, remote_control_key_id: u8) -> String {
    let service_class = (service_id & 0b0000_0001_1000_0000) >> 7;
    let service_number = (service_id & 0b0000_0000_0000_0111) + 1;
    format!(
        "{:03}",
        service_class * 200 + u16::from(remote_control_key_id) * 10 + service_number
    )
}

/// BS/CS channel numbers are the service ID itself.
pub fn satellite_channel_number(service_id: u16) -> String {
    format!("{service_id:03}")
}
