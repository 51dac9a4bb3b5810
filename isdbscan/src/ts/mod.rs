//! PSI/SI decoding for channel enumeration.
//!
//! Only the tables a channel scan needs are decoded: NIT (actual) on PID
//! 0x0010 and SDT (actual and other) on PID 0x0011. The output of this
//! module is a closed set of typed section records; nothing downstream
//! touches raw table bytes.

pub mod nit;
pub mod packet;
pub mod psi;
pub mod sdt;
pub mod text;

pub use nit::{NitSection, NitTransportStream};
pub use packet::{SectionDemux, SYNC_BYTE, TS_PACKET_SIZE};
pub use psi::{PsiError, PsiSection};
pub use sdt::{SdtSection, SdtServiceEntry};

/// Well-known PIDs.
pub mod pid {
    /// Network Information Table PID.
    pub const NIT: u16 = 0x0010;
    /// Service Description Table PID.
    pub const SDT: u16 = 0x0011;
    /// Null packet PID (stuffing).
    pub const NULL: u16 = 0x1FFF;
}

/// Table IDs for the sections this scanner consumes.
pub mod table_id {
    /// Network Information Section - actual network.
    pub const NIT_ACTUAL: u8 = 0x40;
    /// Service Description Section - actual TS.
    pub const SDT_ACTUAL: u8 = 0x42;
    /// Service Description Section - other TS (same network).
    pub const SDT_OTHER: u8 = 0x46;
}

/// Descriptor tags used in NIT/SDT.
pub mod descriptor_tag {
    /// Network name descriptor.
    pub const NETWORK_NAME: u8 = 0x40;
    /// Satellite delivery system descriptor.
    pub const SATELLITE_DELIVERY: u8 = 0x43;
    /// Service descriptor.
    pub const SERVICE: u8 = 0x48;
    /// TS information descriptor (ISDB-T: TS name + remote-control key).
    pub const TS_INFORMATION: u8 = 0xCD;
    /// Partial reception descriptor (ISDB-T one-seg service list).
    pub const PARTIAL_RECEPTION: u8 = 0xFB;
}

/// Decoded tables accumulated from one capture.
#[derive(Debug, Clone, Default)]
pub struct DecodedTables {
    /// NIT-actual sections, one per (version, section number).
    pub nit: Vec<NitSection>,
    /// SDT sections, actual and other, one per (table id, TSID, version,
    /// section number).
    pub sdt: Vec<SdtSection>,
}

impl DecodedTables {
    /// True when nothing at all was decoded.
    pub fn is_empty(&self) -> bool {
        self.nit.is_empty() && self.sdt.is_empty()
    }
}

/// Iterate (tag, body) pairs of a descriptor loop. Truncated trailing
/// bytes are dropped.
pub(crate) fn descriptors(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> + '_ {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos + 2 > data.len() {
            return None;
        }
        let tag = data[pos];
        let len = data[pos + 1] as usize;
        if pos + 2 + len > data.len() {
            return None;
        }
        let body = &data[pos + 2..pos + 2 + len];
        pos += 2 + len;
        Some((tag, body))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_walk() {
        let data = [0x40, 0x02, 0xAA, 0xBB, 0x48, 0x01, 0x01, 0xFF];
        let parsed: Vec<(u8, Vec<u8>)> = descriptors(&data)
            .map(|(tag, body)| (tag, body.to_vec()))
            .collect();
        // The trailing 0xFF has no length byte and is dropped.
        assert_eq!(parsed, vec![(0x40, vec![0xAA, 0xBB]), (0x48, vec![0x01])]);
    }
}
