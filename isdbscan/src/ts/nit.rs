//! Network Information Table (actual network) sections.

use super::psi::{PsiError, PsiSection};
use super::{descriptor_tag, descriptors, table_id, text};

/// One transport stream entry from the NIT loop.
#[derive(Debug, Clone, Default)]
pub struct NitTransportStream {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    /// TS name from the TS-information descriptor (terrestrial).
    pub ts_name: Option<String>,
    /// Remote-control key ID from the TS-information descriptor.
    pub remote_control_key_id: Option<u8>,
    /// One-seg service IDs from the partial-reception descriptor.
    pub partial_reception_service_ids: Vec<u16>,
    /// Downlink frequency in GHz from the satellite delivery descriptor.
    pub satellite_frequency: Option<f64>,
}

/// A decoded NIT-actual section.
///
/// Satellite networks list the full transponder map here, which is what
/// lets one tuned channel enumerate the whole network.
#[derive(Debug, Clone)]
pub struct NitSection {
    pub network_id: u16,
    pub version_number: u8,
    pub section_number: u8,
    /// Network name descriptor, decoded and normalized.
    pub network_name: Option<String>,
    pub transport_streams: Vec<NitTransportStream>,
}

impl NitSection {
    /// Parse an NIT-actual section body.
    pub fn parse(section: &PsiSection) -> Result<Self, PsiError> {
        debug_assert_eq!(section.table_id, table_id::NIT_ACTUAL);
        let payload = &section.payload;
        if payload.len() < 2 {
            return Err(PsiError::Truncated(payload.len()));
        }

        let network_descriptors_length =
            (usize::from(payload[0] & 0x0F) << 8) | usize::from(payload[1]);
        let mut pos = 2;
        if pos + network_descriptors_length > payload.len() {
            return Err(PsiError::LengthMismatch {
                declared: pos + network_descriptors_length,
                actual: payload.len(),
            });
        }

        let mut network_name = None;
        for (tag, body) in descriptors(&payload[pos..pos + network_descriptors_length]) {
            if tag == descriptor_tag::NETWORK_NAME {
                network_name = Some(text::decode_arib_text(body));
            }
        }
        pos += network_descriptors_length;

        if pos + 2 > payload.len() {
            return Err(PsiError::Truncated(payload.len()));
        }
        let ts_loop_length = (usize::from(payload[pos] & 0x0F) << 8) | usize::from(payload[pos + 1]);
        pos += 2;
        let loop_end = (pos + ts_loop_length).min(payload.len());

        let mut transport_streams = Vec::new();
        while pos + 6 <= loop_end {
            let transport_stream_id = u16::from(payload[pos]) << 8 | u16::from(payload[pos + 1]);
            let original_network_id =
                u16::from(payload[pos + 2]) << 8 | u16::from(payload[pos + 3]);
            let descriptors_length =
                (usize::from(payload[pos + 4] & 0x0F) << 8) | usize::from(payload[pos + 5]);
            pos += 6;
            let descriptors_end = (pos + descriptors_length).min(loop_end);

            let mut entry = NitTransportStream {
                transport_stream_id,
                original_network_id,
                ..NitTransportStream::default()
            };
            for (tag, body) in descriptors(&payload[pos..descriptors_end]) {
                match tag {
                    descriptor_tag::TS_INFORMATION => {
                        if body.len() >= 2 {
                            entry.remote_control_key_id = Some(body[0]);
                            let name_len = usize::from(body[1] >> 2);
                            if 2 + name_len <= body.len() {
                                entry.ts_name =
                                    Some(text::decode_arib_text(&body[2..2 + name_len]));
                            }
                        }
                    }
                    descriptor_tag::PARTIAL_RECEPTION => {
                        entry.partial_reception_service_ids = body
                            .chunks_exact(2)
                            .map(|sid| u16::from(sid[0]) << 8 | u16::from(sid[1]))
                            .collect();
                    }
                    descriptor_tag::SATELLITE_DELIVERY => {
                        if body.len() >= 4 {
                            entry.satellite_frequency = Some(decode_frequency(&body[..4]));
                        }
                    }
                    _ => {}
                }
            }
            pos = descriptors_end;
            transport_streams.push(entry);
        }

        Ok(Self {
            network_id: section.table_id_extension,
            version_number: section.version_number,
            section_number: section.section_number,
            network_name,
            transport_streams,
        })
    }
}

/// Satellite delivery frequency: 8 BCD digits spelling XXX.XXXXX GHz.
fn decode_frequency(bcd: &[u8]) -> f64 {
    let mut digits: u64 = 0;
    for &byte in bcd {
        digits = digits * 100 + u64::from(byte >> 4) * 10 + u64::from(byte & 0x0F);
    }
    digits as f64 / 100_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section_with_payload(network_id: u16, payload: Vec<u8>) -> PsiSection {
        PsiSection {
            table_id: table_id::NIT_ACTUAL,
            table_id_extension: network_id,
            version_number: 0,
            current_next: true,
            section_number: 0,
            last_section_number: 0,
            payload,
        }
    }

    #[test]
    fn test_decode_frequency_bcd() {
        // 11.72748 GHz -> digits 01172748
        assert_eq!(decode_frequency(&[0x01, 0x17, 0x27, 0x48]), 11.72748);
    }

    #[test]
    fn test_parse_terrestrial_nit() {
        // TS-information descriptor: remocon 1, name "ＡＢ" (full-width, 4 bytes)
        let ts_info = [0xCD, 0x06, 0x01, 0x04 << 2, 0x23, 0x41, 0x23, 0x42];
        // Partial reception: one-seg SID 0x0610
        let partial = [0xFB, 0x02, 0x06, 0x10];
        let descriptors_len = ts_info.len() + partial.len();

        let mut payload = vec![0xF0, 0x00]; // no network descriptors
        let ts_loop_len = 6 + descriptors_len;
        payload.extend_from_slice(&[0xF0, ts_loop_len as u8]);
        payload.extend_from_slice(&[0x7F, 0xE0]); // TSID
        payload.extend_from_slice(&[0x7F, 0xE8]); // original network
        payload.extend_from_slice(&[0xF0, descriptors_len as u8]);
        payload.extend_from_slice(&ts_info);
        payload.extend_from_slice(&partial);

        let nit = NitSection::parse(&section_with_payload(0x7FE8, payload)).unwrap();
        assert_eq!(nit.network_id, 0x7FE8);
        assert_eq!(nit.transport_streams.len(), 1);
        let ts = &nit.transport_streams[0];
        assert_eq!(ts.transport_stream_id, 0x7FE0);
        assert_eq!(ts.remote_control_key_id, Some(1));
        assert_eq!(ts.ts_name.as_deref(), Some("AB")); // normalized to half-width
        assert_eq!(ts.partial_reception_service_ids, vec![0x0610]);
    }

    #[test]
    fn test_parse_satellite_nit_lists_all_transponders() {
        // Escape to the alphanumeric set, then plain ASCII
        let name = [0x1B, 0x28, 0x4A, b'B', b'S', b'-', b'N', b'E', b'T'];
        let mut payload = vec![0xF0, (name.len() + 2) as u8];
        payload.push(descriptor_tag::NETWORK_NAME);
        payload.push(name.len() as u8);
        payload.extend_from_slice(&name);

        // Two transport streams, each with a satellite delivery descriptor.
        let mut ts_loop = Vec::new();
        for (tsid, freq_bcd) in [(0x4010u16, [0x01, 0x17, 0x27, 0x48]), (0x4011, [0x01, 0x17, 0x65, 0x84])] {
            ts_loop.extend_from_slice(&tsid.to_be_bytes());
            ts_loop.extend_from_slice(&[0x00, 0x04]); // original network id
            let sat = {
                let mut d = vec![0x43, 0x0B];
                d.extend_from_slice(&freq_bcd);
                d.extend_from_slice(&[0x01, 0x10, 0x00, 0xE0, 0x28, 0x80, 0x07]);
                d
            };
            ts_loop.extend_from_slice(&[0xF0, sat.len() as u8]);
            ts_loop.extend_from_slice(&sat);
        }
        payload.extend_from_slice(&[0xF0, ts_loop.len() as u8]);
        payload.extend_from_slice(&ts_loop);

        let nit = NitSection::parse(&section_with_payload(0x0004, payload)).unwrap();
        assert_eq!(nit.network_name.as_deref(), Some("BS-NET"));
        assert_eq!(nit.transport_streams.len(), 2);
        assert_eq!(nit.transport_streams[0].satellite_frequency, Some(11.72748));
        assert_eq!(nit.transport_streams[1].satellite_frequency, Some(11.76584));
    }
}
