//! Program association table (table id `0x00`), the entry point of the
//! PSI hierarchy: it maps each program number to the PID carrying that
//! program's PMT.

use super::TableHeader;
use crate::section::Section;

#[derive(Clone, Debug)]
pub struct Pat {
    pub header: TableHeader,
    pub transport_stream_id: u16,
    /// Program number to PMT PID, in wire order. Program number zero is
    /// kept separately as the network PID.
    pub programs: Vec<(u16, u16)>,
    pub network_pid: Option<u16>,
}

impl Pat {
    pub(crate) fn claims(table_id: u8) -> bool {
        table_id == 0x00
    }

    pub(crate) fn decode(section: &Section) -> Option<Self> {
        if !section.syntax() {
            return None;
        }

        let payload = section.payload();
        let header = TableHeader::decode(payload)?;
        if payload.len() < 9 {
            return None;
        }

        let transport_stream_id = u16::from_be_bytes([payload[0], payload[1]]);
        let end = payload.len() - 4;

        let mut programs = Vec::new();
        let mut network_pid = None;
        let mut offset = 5usize;
        while end - offset >= 4 {
            let program = u16::from_be_bytes([payload[offset], payload[offset + 1]]);
            let pid = u16::from_be_bytes([payload[offset + 2], payload[offset + 3]]) & 0x1FFF;
            if program == 0 {
                network_pid = Some(pid);
            } else {
                programs.push((program, pid));
            }
            offset += 4;
        }

        Some(Self {
            header,
            transport_stream_id,
            programs,
            network_pid,
        })
    }

    /// PMT PID assigned to `program`, if this section lists it.
    pub fn pid_of(&self, program: u16) -> Option<u16> {
        self.programs
            .iter()
            .find(|(number, _)| *number == program)
            .map(|(_, pid)| *pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{FrameOutcome, Section, encode_section};

    fn decode(body: &[u8]) -> Pat {
        let wire = encode_section(0x00, true, body);
        match Section::frame(&wire) {
            FrameOutcome::Framed(section) => match section.into_table() {
                Some(crate::tables::Table::Pat(pat)) => pat,
                other => panic!("unexpected {other:?}"),
            },
            _ => panic!("expected a framed section"),
        }
    }

    #[test]
    fn associations_and_network_pid() {
        let pat = decode(&[
            0x04, 0xD2, // transport stream 1234
            0xC1, 0x00, 0x00, // version 0, current, single section
            0x00, 0x00, 0xE0, 0x10, // network PID 0x10
            0x00, 0x01, 0xE1, 0x00, // program 1 on PID 0x100
            0x00, 0x02, 0xE2, 0x00, // program 2 on PID 0x200
        ]);

        assert_eq!(pat.transport_stream_id, 1234);
        assert_eq!(pat.network_pid, Some(0x10));
        assert_eq!(pat.programs, vec![(1, 0x100), (2, 0x200)]);
        assert_eq!(pat.pid_of(2), Some(0x200));
        assert_eq!(pat.pid_of(7), None);
    }

    #[test]
    fn partial_trailing_entry_is_padding() {
        let pat = decode(&[
            0x00, 0x01, 0xC1, 0x00, 0x00, //
            0x00, 0x01, 0xE1, 0x00, //
            0xFF, 0xFF, // short of a full entry
        ]);
        assert_eq!(pat.programs, vec![(1, 0x100)]);
    }

    #[test]
    fn empty_program_loop() {
        let pat = decode(&[0x00, 0x01, 0xC1, 0x00, 0x00]);
        assert!(pat.programs.is_empty());
        assert!(pat.network_pid.is_none());
    }
}
