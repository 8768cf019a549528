//! Program map table (table id `0x02`): the elementary streams making up
//! one program, each with its PID and descriptor loop.

use bytes::Bytes;

use super::TableHeader;
use crate::descriptors::{Descriptor, DescriptorLoader};
use crate::section::Section;

/// Coarse classification of an elementary stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamType {
    Video,
    Audio,
    Teletext,
    Subtitles,
    Other,
}

#[derive(Clone, Debug)]
pub struct Pmt {
    pub header: TableHeader,
    pub program_number: u16,
    pub pcr_pid: u16,
    pub program_descriptors: DescriptorLoader,
    pub streams: Vec<StreamEntry>,
}

/// One elementary stream of the program.
#[derive(Clone, Debug)]
pub struct StreamEntry {
    pub stream_type: u8,
    pub pid: u16,
    pub descriptors: DescriptorLoader,
}

impl StreamEntry {
    /// Tries to reconstruct one entry from the front of `data`, returning
    /// the entry and its encoded length.
    fn decode(data: &Bytes) -> Option<(Self, usize)> {
        if data.len() < 5 {
            return None;
        }

        let info_length = (((data[3] as usize) & 0x0F) << 8) | data[4] as usize;
        if 5 + info_length > data.len() {
            return None;
        }

        let entry = Self {
            stream_type: data[0],
            pid: u16::from_be_bytes([data[1], data[2]]) & 0x1FFF,
            descriptors: DescriptorLoader::new(data.slice(5..5 + info_length)),
        };
        Some((entry, 5 + info_length))
    }

    /// Classifies the stream, consulting the descriptor loop for the
    /// private stream types that carry teletext, subtitles or AC-3.
    pub fn kind(&self) -> StreamType {
        match self.stream_type {
            0x01 | 0x02 | 0x10 | 0x1B | 0x24 => StreamType::Video,
            0x03 | 0x04 | 0x0F | 0x11 => StreamType::Audio,
            0x06 => {
                for descriptor in self.descriptors.descriptors() {
                    match descriptor {
                        Descriptor::Teletext(_) => return StreamType::Teletext,
                        Descriptor::Subtitling(_) => return StreamType::Subtitles,
                        Descriptor::Ac3(_) | Descriptor::Aac(_) => return StreamType::Audio,
                        _ => {}
                    }
                }
                StreamType::Other
            }
            _ => StreamType::Other,
        }
    }
}

impl Pmt {
    pub(crate) fn claims(table_id: u8) -> bool {
        table_id == 0x02
    }

    pub(crate) fn decode(section: &Section) -> Option<Self> {
        if !section.syntax() {
            return None;
        }

        let payload = section.payload();
        let header = TableHeader::decode(payload)?;
        if payload.len() < 13 {
            return None;
        }

        let program_number = u16::from_be_bytes([payload[0], payload[1]]);
        let pcr_pid = u16::from_be_bytes([payload[5], payload[6]]) & 0x1FFF;
        let program_info_length =
            (((payload[7] as usize) & 0x0F) << 8) | payload[8] as usize;

        let end = payload.len() - 4;
        if 9 + program_info_length > end {
            return None;
        }
        let program_descriptors =
            DescriptorLoader::new(payload.slice(9..9 + program_info_length));

        let mut streams = Vec::new();
        let mut offset = 9 + program_info_length;
        while offset < end {
            let Some((entry, consumed)) = StreamEntry::decode(&payload.slice(offset..end))
            else {
                break;
            };
            streams.push(entry);
            offset += consumed;
        }

        Some(Self {
            header,
            program_number,
            pcr_pid,
            program_descriptors,
            streams,
        })
    }
}
