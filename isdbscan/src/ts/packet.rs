//! TS packet framing and PSI section reassembly.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::psi::PsiSection;
use super::{pid, table_id, DecodedTables, NitSection, SdtSection};

/// Fixed TS packet length.
pub const TS_PACKET_SIZE: usize = 188;
/// TS sync byte.
pub const SYNC_BYTE: u8 = 0x47;

/// Parsed packet header fields the demux needs.
struct PacketHeader {
    pid: u16,
    payload_unit_start: bool,
    transport_error: bool,
    scrambled: bool,
    continuity_counter: u8,
    payload_offset: usize,
    has_payload: bool,
}

fn parse_header(packet: &[u8]) -> Option<PacketHeader> {
    if packet.len() < TS_PACKET_SIZE || packet[0] != SYNC_BYTE {
        return None;
    }
    let transport_error = packet[1] & 0x80 != 0;
    let payload_unit_start = packet[1] & 0x40 != 0;
    let pid = u16::from(packet[1] & 0x1F) << 8 | u16::from(packet[2]);
    let scrambled = packet[3] & 0xC0 != 0;
    let adaptation = packet[3] >> 4 & 0x3;
    let continuity_counter = packet[3] & 0x0F;

    let mut payload_offset = 4;
    if adaptation & 0x2 != 0 {
        let af_len = packet[4] as usize;
        payload_offset = 5 + af_len;
    }
    let has_payload = adaptation & 0x1 != 0 && payload_offset < TS_PACKET_SIZE;

    Some(PacketHeader {
        pid,
        payload_unit_start,
        transport_error,
        scrambled,
        continuity_counter,
        payload_offset,
        has_payload,
    })
}

/// Reassembles PSI sections on one PID across packets.
#[derive(Default)]
struct SectionAssembler {
    buffer: Vec<u8>,
    last_counter: Option<u8>,
    // Nothing is collected until the first payload-unit start is seen.
    synced: bool,
}

impl SectionAssembler {
    /// Feed one packet payload; returns any sections completed by it.
    fn push(&mut self, payload: &[u8], unit_start: bool, counter: u8) -> Vec<Vec<u8>> {
        if let Some(last) = self.last_counter {
            if counter != (last + 1) & 0x0F && counter != last {
                // Continuity break: the partial section is unusable.
                self.buffer.clear();
                self.synced = false;
            }
        }
        self.last_counter = Some(counter);

        if unit_start {
            if payload.is_empty() {
                return Vec::new();
            }
            let pointer = payload[0] as usize;
            if 1 + pointer > payload.len() {
                self.buffer.clear();
                self.synced = false;
                return Vec::new();
            }
            if self.synced {
                self.buffer.extend_from_slice(&payload[1..1 + pointer]);
            }
            let mut sections = self.drain_complete();
            self.buffer.clear();
            self.synced = true;
            self.buffer.extend_from_slice(&payload[1 + pointer..]);
            sections.extend(self.drain_complete());
            sections
        } else {
            if !self.synced {
                return Vec::new();
            }
            self.buffer.extend_from_slice(payload);
            self.drain_complete()
        }
    }

    fn drain_complete(&mut self) -> Vec<Vec<u8>> {
        let mut sections = Vec::new();
        loop {
            if self.buffer.first() == Some(&0xFF) {
                // Stuffing: no further section in this unit.
                self.buffer.clear();
                break;
            }
            if self.buffer.len() < 3 {
                break;
            }
            let section_length =
                (usize::from(self.buffer[1] & 0x0F) << 8) | usize::from(self.buffer[2]);
            let total = 3 + section_length;
            if self.buffer.len() < total {
                break;
            }
            sections.push(self.buffer[..total].to_vec());
            self.buffer.drain(..total);
        }
        sections
    }
}

/// Demultiplexes a captured byte stream into decoded NIT/SDT sections.
///
/// Feed raw capture bytes in any chunking; packet alignment is recovered by
/// searching for the sync byte. Sections already seen (same table id,
/// extension, version and section number) are decoded once.
pub struct SectionDemux {
    assemblers: HashMap<u16, SectionAssembler>,
    seen: HashSet<(u8, u16, u8, u8)>,
    tables: DecodedTables,
    carry: Vec<u8>,
    packets: usize,
}

impl SectionDemux {
    pub fn new() -> Self {
        Self {
            assemblers: HashMap::new(),
            seen: HashSet::new(),
            tables: DecodedTables::default(),
            carry: Vec::with_capacity(TS_PACKET_SIZE * 4),
            packets: 0,
        }
    }

    /// Feed capture bytes.
    pub fn feed(&mut self, data: &[u8]) {
        self.carry.extend_from_slice(data);

        // Align on the sync byte.
        if self.carry.first().is_some_and(|&b| b != SYNC_BYTE) {
            match self.carry.iter().position(|&b| b == SYNC_BYTE) {
                Some(pos) => {
                    debug!("resync: dropped {pos} bytes");
                    self.carry.drain(..pos);
                }
                None => {
                    self.carry.clear();
                    return;
                }
            }
        }

        let mut offset = 0;
        while offset + TS_PACKET_SIZE <= self.carry.len() {
            if self.carry[offset] != SYNC_BYTE {
                offset += 1;
                continue;
            }
            let packet = self.carry[offset..offset + TS_PACKET_SIZE].to_vec();
            self.process_packet(&packet);
            offset += TS_PACKET_SIZE;
        }
        self.carry.drain(..offset);
    }

    fn process_packet(&mut self, packet: &[u8]) {
        let Some(header) = parse_header(packet) else {
            return;
        };
        self.packets += 1;

        if header.transport_error || header.scrambled || !header.has_payload {
            return;
        }
        if header.pid != pid::NIT && header.pid != pid::SDT {
            return;
        }

        let payload = &packet[header.payload_offset.min(TS_PACKET_SIZE)..];
        let assembler = self.assemblers.entry(header.pid).or_default();
        let sections =
            assembler.push(payload, header.payload_unit_start, header.continuity_counter);
        for section in sections {
            self.process_section(header.pid, &section);
        }
    }

    fn process_section(&mut self, pid_val: u16, data: &[u8]) {
        let section = match PsiSection::parse(data) {
            Ok(s) => s,
            Err(e) => {
                debug!("dropped malformed section on PID 0x{pid_val:04X}: {e}");
                return;
            }
        };
        if !section.current_next {
            return;
        }

        let key = (
            section.table_id,
            section.table_id_extension,
            section.version_number,
            section.section_number,
        );
        if !self.seen.insert(key) {
            return;
        }

        match (pid_val, section.table_id) {
            (pid::NIT, table_id::NIT_ACTUAL) => {
                if let Ok(nit) = NitSection::parse(&section) {
                    self.tables.nit.push(nit);
                }
            }
            (pid::SDT, table_id::SDT_ACTUAL | table_id::SDT_OTHER) => {
                if let Ok(sdt) = SdtSection::parse(&section) {
                    self.tables.sdt.push(sdt);
                }
            }
            _ => {}
        }
    }

    /// Packets inspected so far.
    pub fn packets_processed(&self) -> usize {
        self.packets
    }

    /// Finish and hand back the decoded tables.
    pub fn into_tables(self) -> DecodedTables {
        self.tables
    }
}

impl Default for SectionDemux {
    fn default() -> Self {
        Self::new()
    }
}
