//! Generic PSI section header parsing.

use thiserror::Error;

/// Errors for malformed PSI sections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PsiError {
    /// Section shorter than its header.
    #[error("section truncated: {0} bytes")]
    Truncated(usize),

    /// Section length field disagrees with the available bytes.
    #[error("section length mismatch: declared {declared}, have {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Long-form (section syntax) header required but absent.
    #[error("short-form section not supported (table 0x{0:02X})")]
    ShortForm(u8),
}

/// A complete PSI section with the long-form header.
///
/// `payload` is the table body between the 8-byte header and the trailing
/// CRC32. The CRC is not re-verified; transport-level errors are already
/// filtered out at the packet layer.
#[derive(Debug, Clone)]
pub struct PsiSection {
    pub table_id: u8,
    /// Table-specific extension: network id for NIT, TSID for SDT.
    pub table_id_extension: u16,
    pub version_number: u8,
    pub current_next: bool,
    pub section_number: u8,
    pub last_section_number: u8,
    pub payload: Vec<u8>,
}

impl PsiSection {
    /// Parse one complete section.
    pub fn parse(data: &[u8]) -> Result<Self, PsiError> {
        if data.len() < 3 {
            return Err(PsiError::Truncated(data.len()));
        }
        let table_id = data[0];
        if data[1] & 0x80 == 0 {
            return Err(PsiError::ShortForm(table_id));
        }
        let section_length = (usize::from(data[1] & 0x0F) << 8) | usize::from(data[2]);
        let total = 3 + section_length;
        if data.len() < total || section_length < 9 {
            return Err(PsiError::LengthMismatch {
                declared: total,
                actual: data.len(),
            });
        }

        Ok(Self {
            table_id,
            table_id_extension: u16::from(data[3]) << 8 | u16::from(data[4]),
            version_number: data[5] >> 1 & 0x1F,
            current_next: data[5] & 0x01 != 0,
            section_number: data[6],
            last_section_number: data[7],
            payload: data[8..total - 4].to_vec(),
        })
    }
}
