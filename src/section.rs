//! SI section framing: the CRC-protected unit carrying all or part of a table.
//!
//! Physical layout (ETSI EN 300 468): byte 0 is the table identifier, bit 7
//! of byte 1 the syntax indicator, bits 3-0 of byte 1 plus byte 2 a 12-bit
//! length, followed by that many payload bytes. For every table identifier
//! except the two housekeeping ones the last four payload bytes are the
//! big-endian CRC-32.

use bytes::Bytes;

use crate::crc32;
use crate::tables::Table;

/// Table identifiers whose sections carry no CRC (TDT and friends).
const UNPROTECTED_TABLE_IDS: [u8; 2] = [0x70, 0x71];

/// Minimum number of buffered bytes before framing is attempted.
const MIN_SECTION_BYTES: usize = 7;

/// One framed SI section with a private copy of its payload.
///
/// When the checksum validates, construction of the matching [`Table`]
/// variant is attempted; the result is kept only if the variant decoded
/// its body consistently.
pub struct Section {
    table_id: u8,
    /// Upper nibble of the second header byte, preserved for re-encoding.
    flags: u8,
    syntax: bool,
    is_valid: bool,
    payload: Bytes,
    table: Option<Table>,
}

/// Result of a framing attempt at the current read position.
pub(crate) enum FrameOutcome {
    /// Fewer than the minimum header bytes are buffered.
    NeedHeader,
    /// The declared length exceeds the buffered bytes.
    NeedBody,
    Framed(Section),
}

impl Section {
    /// Tries to frame one section from the start of `buf`.
    pub(crate) fn frame(buf: &[u8]) -> FrameOutcome {
        if buf.len() < MIN_SECTION_BYTES {
            return FrameOutcome::NeedHeader;
        }

        let table_id = buf[0];
        let flags = buf[1];
        let syntax = flags & 0x80 != 0;
        let size = ((flags as usize & 0x0F) << 8) | buf[2] as usize;

        if 3 + size > buf.len() {
            return FrameOutcome::NeedBody;
        }

        let is_valid = if UNPROTECTED_TABLE_IDS.contains(&table_id) {
            true
        } else {
            crc32::check(&buf[..3 + size])
        };

        let mut section = Section {
            table_id,
            flags: flags & 0xF0,
            syntax,
            is_valid,
            payload: Bytes::copy_from_slice(&buf[3..3 + size]),
            table: None,
        };

        // No table construction on a broken checksum.
        if section.is_valid {
            section.table = Table::decode(&section);
        }

        FrameOutcome::Framed(section)
    }

    pub fn table_id(&self) -> u8 {
        self.table_id
    }

    pub fn syntax(&self) -> bool {
        self.syntax
    }

    /// Reports whether the checksum validated (always set for the
    /// housekeeping table identifiers that carry none).
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Complete section length on the wire, header included.
    pub fn len(&self) -> usize {
        3 + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Raw payload bytes, trailing CRC included where present.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The decoded table, present only for a valid section whose table
    /// identifier is claimed by a known variant.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Consumes the section, yielding the decoded table if any.
    pub fn into_table(self) -> Option<Table> {
        self.table
    }

    /// Serializes the section back to wire bytes with a freshly computed
    /// checksum. Only valid sections can be re-encoded.
    pub fn to_wire_bytes(&self) -> Option<Vec<u8>> {
        if !self.is_valid || self.table.is_none() {
            return None;
        }

        let mut out = Vec::with_capacity(self.len());
        out.push(self.table_id);
        out.push(self.flags | (self.payload.len() >> 8) as u8);
        out.push((self.payload.len() & 0xFF) as u8);
        out.extend_from_slice(&self.payload);

        if !UNPROTECTED_TABLE_IDS.contains(&self.table_id) {
            let crc_at = out.len() - 4;
            let crc = crc32::checksum(&out[..crc_at]);
            out[crc_at..].copy_from_slice(&crc.to_be_bytes());
        }

        Some(out)
    }
}

impl std::ops::Index<usize> for Section {
    type Output = u8;

    fn index(&self, index: usize) -> &u8 {
        &self.payload[index]
    }
}

impl std::fmt::Debug for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section")
            .field("table_id", &self.table_id)
            .field("syntax", &self.syntax)
            .field("is_valid", &self.is_valid)
            .field("len", &self.len())
            .field("table", &self.table.as_ref().map(Table::name))
            .finish()
    }
}

/// Builds a complete section for `body`, appending the CRC unless the table
/// identifier is one of the unprotected housekeeping ids.
///
/// `body` is the section payload without the checksum. Used by tests and
/// tooling to synthesize wire data.
pub fn encode_section(table_id: u8, syntax: bool, body: &[u8]) -> Vec<u8> {
    let crc_bytes = if UNPROTECTED_TABLE_IDS.contains(&table_id) {
        0
    } else {
        4
    };
    let size = body.len() + crc_bytes;
    assert!(size <= 0x0FFF, "section body too large");

    let mut out = Vec::with_capacity(3 + size);
    out.push(table_id);
    out.push(if syntax { 0xB0 } else { 0x30 } | (size >> 8) as u8);
    out.push((size & 0xFF) as u8);
    out.extend_from_slice(body);

    if crc_bytes > 0 {
        let crc = crc32::checksum(&out);
        out.extend_from_slice(&crc.to_be_bytes());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_needs_minimum_header() {
        assert!(matches!(Section::frame(&[0x00; 6]), FrameOutcome::NeedHeader));
    }

    #[test]
    fn frame_waits_for_body() {
        // Declared length 0x0D but only the header is present.
        let buf = [0x00, 0xB0, 0x0D, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(Section::frame(&buf), FrameOutcome::NeedBody));
    }

    #[test]
    fn crc_failure_yields_invalid_section() {
        let mut wire = encode_section(0x00, true, &[0x00, 0x01, 0xC1, 0x00, 0x00]);
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;

        match Section::frame(&wire) {
            FrameOutcome::Framed(section) => {
                assert!(!section.is_valid());
                assert!(section.table().is_none());
            }
            _ => panic!("expected a framed section"),
        }
    }

    #[test]
    fn tdt_sections_skip_crc() {
        // MJD + BCD time, no CRC on table id 0x70.
        let wire = encode_section(0x70, false, &[0xC0, 0x79, 0x12, 0x45, 0x00]);

        match Section::frame(&wire) {
            FrameOutcome::Framed(section) => {
                assert!(section.is_valid());
                assert_eq!(section.len(), wire.len());
            }
            _ => panic!("expected a framed section"),
        }
    }

    #[test]
    fn wire_roundtrip_preserves_bytes() {
        let wire = encode_section(0x00, true, &[0x12, 0x34, 0xC1, 0x00, 0x00]);

        let section = match Section::frame(&wire) {
            FrameOutcome::Framed(section) => section,
            _ => panic!("expected a framed section"),
        };
        assert_eq!(section.to_wire_bytes().unwrap(), wire);
    }
}
