//! Service Description Table sections.
//!
//! Both the actual-TS (0x42) and other-TS (0x46) forms are decoded:
//! satellite networks announce every sibling transport stream's services
//! through the other-TS form, and that is what lets a single-channel probe
//! enumerate the whole network.

use super::psi::{PsiError, PsiSection};
use super::{descriptor_tag, descriptors, table_id, text};

/// One service entry from an SDT section.
#[derive(Debug, Clone, Default)]
pub struct SdtServiceEntry {
    pub service_id: u16,
    /// Conditional-access flag; set means the service is not free-to-air.
    pub free_ca_mode: bool,
    /// ARIB service-type code from the service descriptor.
    pub service_type: Option<u8>,
    /// Service name, decoded and normalized.
    pub service_name: Option<String>,
    /// Provider name from the service descriptor.
    pub provider_name: Option<String>,
}

/// A decoded SDT section (actual or other TS).
#[derive(Debug, Clone)]
pub struct SdtSection {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub version_number: u8,
    pub section_number: u8,
    /// True for the actual-TS form (0x42).
    pub actual: bool,
    pub services: Vec<SdtServiceEntry>,
}

impl SdtSection {
    /// Parse an SDT section body.
    pub fn parse(section: &PsiSection) -> Result<Self, PsiError> {
        debug_assert!(matches!(
            section.table_id,
            table_id::SDT_ACTUAL | table_id::SDT_OTHER
        ));
        let payload = &section.payload;
        if payload.len() < 3 {
            return Err(PsiError::Truncated(payload.len()));
        }

        let original_network_id = u16::from(payload[0]) << 8 | u16::from(payload[1]);
        let mut pos = 3;

        let mut services = Vec::new();
        while pos + 5 <= payload.len() {
            let service_id = u16::from(payload[pos]) << 8 | u16::from(payload[pos + 1]);
            let free_ca_mode = payload[pos + 3] & 0x10 != 0;
            let descriptors_length =
                (usize::from(payload[pos + 3] & 0x0F) << 8) | usize::from(payload[pos + 4]);
            pos += 5;
            let descriptors_end = (pos + descriptors_length).min(payload.len());

            let mut entry = SdtServiceEntry {
                service_id,
                free_ca_mode,
                ..SdtServiceEntry::default()
            };
            for (tag, body) in descriptors(&payload[pos..descriptors_end]) {
                if tag == descriptor_tag::SERVICE && body.len() >= 2 {
                    entry.service_type = Some(body[0]);
                    let provider_len = usize::from(body[1]);
                    let name_len_at = 2 + provider_len;
                    if name_len_at < body.len() {
                        if provider_len > 0 {
                            entry.provider_name =
                                Some(text::decode_arib_text(&body[2..name_len_at]));
                        }
                        let name_len = usize::from(body[name_len_at]);
                        let name_end = name_len_at + 1 + name_len;
                        if name_end <= body.len() {
                            entry.service_name = Some(text::decode_arib_text(
                                &body[name_len_at + 1..name_end],
                            ));
                        }
                    }
                }
            }
            pos = descriptors_end;
            services.push(entry);
        }

        Ok(Self {
            transport_stream_id: section.table_id_extension,
            original_network_id,
            version_number: section.version_number,
            section_number: section.section_number,
            actual: section.table_id == table_id::SDT_ACTUAL,
            services,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::table_id::{SDT_ACTUAL, SDT_OTHER};

    fn section_with_payload(table: u8, tsid: u16, payload: Vec<u8>) -> PsiSection {
        PsiSection {
            table_id: table,
            table_id_extension: tsid,
            version_number: 0,
            current_next: true,
            section_number: 0,
            last_section_number: 0,
            payload,
        }
    }

    fn service_entry(sid: u16, free_ca: bool, service_type: u8, name: &[u8]) -> Vec<u8> {
        let mut descriptor = vec![0x48, (3 + name.len()) as u8, service_type, 0x00];
        descriptor.push(name.len() as u8);
        descriptor.extend_from_slice(name);

        let mut entry = sid.to_be_bytes().to_vec();
        entry.push(0xFC);
        let flags = (if free_ca { 0x90u8 } else { 0x80 }) | ((descriptor.len() >> 8) as u8 & 0x0F);
        entry.push(flags);
        entry.push((descriptor.len() & 0xFF) as u8);
        entry.extend_from_slice(&descriptor);
        entry
    }

    #[test]
    fn test_parse_services() {
        let mut payload = vec![0x7F, 0xE8, 0xFF];
        // ＮＨＫ in full-width (kanji-set row 3)
        payload.extend_from_slice(&service_entry(
            1024,
            false,
            0x01,
            &[0x23, 0x4E, 0x23, 0x48, 0x23, 0x4B],
        ));
        payload.extend_from_slice(&service_entry(1025, true, 0x01, &[0x23, 0x42]));

        let sdt = SdtSection::parse(&section_with_payload(SDT_ACTUAL, 0x7FE0, payload)).unwrap();
        assert_eq!(sdt.transport_stream_id, 0x7FE0);
        assert_eq!(sdt.original_network_id, 0x7FE8);
        assert!(sdt.actual);
        assert_eq!(sdt.services.len(), 2);

        let first = &sdt.services[0];
        assert_eq!(first.service_id, 1024);
        assert!(!first.free_ca_mode);
        assert_eq!(first.service_type, Some(0x01));
        assert_eq!(first.service_name.as_deref(), Some("NHK"));

        let second = &sdt.services[1];
        assert!(second.free_ca_mode);
        assert_eq!(second.service_name.as_deref(), Some("B"));
    }

    #[test]
    fn test_parse_other_ts_form() {
        let mut payload = vec![0x00, 0x04, 0xFF];
        payload.extend_from_slice(&service_entry(101, false, 0x01, &[0x23, 0x41]));

        let sdt = SdtSection::parse(&section_with_payload(SDT_OTHER, 0x4011, payload)).unwrap();
        assert!(!sdt.actual);
        assert_eq!(sdt.transport_stream_id, 0x4011);
        assert_eq!(sdt.services[0].service_id, 101);
    }

    #[test]
    fn test_entry_without_descriptors() {
        let mut payload = vec![0x7F, 0xE8, 0xFF];
        payload.extend_from_slice(&[0x04, 0x00, 0xFC, 0x00, 0x00]);

        let sdt = SdtSection::parse(&section_with_payload(SDT_ACTUAL, 0x7FE0, payload)).unwrap();
        assert_eq!(sdt.services.len(), 1);
        assert_eq!(sdt.services[0].service_type, None);
        assert_eq!(sdt.services[0].service_name, None);
    }
}
