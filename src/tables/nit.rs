//! Network information table (table ids `0x40` and `0x41`): the delivery
//! systems of the network, one descriptor loop for the network itself and
//! one per transport stream.

use bytes::Bytes;

use super::TableHeader;
use crate::descriptors::DescriptorLoader;
use crate::section::Section;

#[derive(Clone, Debug)]
pub struct Nit {
    pub header: TableHeader,
    pub network_id: u16,
    /// Set for table id `0x40`, the network being received.
    pub is_actual: bool,
    pub network_descriptors: DescriptorLoader,
    pub transports: Vec<TransportEntry>,
}

/// One transport stream carried by the network, with its delivery system
/// descriptors.
#[derive(Clone, Debug)]
pub struct TransportEntry {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub descriptors: DescriptorLoader,
}

impl TransportEntry {
    fn decode(data: &Bytes) -> Option<(Self, usize)> {
        if data.len() < 6 {
            return None;
        }

        let info_length = (((data[4] as usize) & 0x0F) << 8) | data[5] as usize;
        if 6 + info_length > data.len() {
            return None;
        }

        let entry = Self {
            transport_stream_id: u16::from_be_bytes([data[0], data[1]]),
            original_network_id: u16::from_be_bytes([data[2], data[3]]),
            descriptors: DescriptorLoader::new(data.slice(6..6 + info_length)),
        };
        Some((entry, 6 + info_length))
    }
}

impl Nit {
    pub(crate) fn claims(table_id: u8) -> bool {
        table_id == 0x40 || table_id == 0x41
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

        let end = payload.len() - 4;
        let network_length = (((payload[5] as usize) & 0x0F) << 8) | payload[6] as usize;
        if 7 + network_length + 2 > end {
            return None;
        }
        let network_descriptors =
            DescriptorLoader::new(payload.slice(7..7 + network_length));

        // The transport loop carries its own length field; clamp to the
        // section body.
        let loop_start = 7 + network_length + 2;
        let loop_length = (((payload[loop_start - 2] as usize) & 0x0F) << 8)
            | payload[loop_start - 1] as usize;
        let loop_end = end.min(loop_start + loop_length);

        let mut transports = Vec::new();
        let mut offset = loop_start;
        while offset < loop_end {
            let Some((entry, consumed)) =
                TransportEntry::decode(&payload.slice(offset..loop_end))
            else {
                break;
            };
            transports.push(entry);
            offset += consumed;
        }

        Some(Self {
            header,
            network_id: u16::from_be_bytes([payload[0], payload[1]]),
            is_actual: section.table_id() == 0x40,
            network_descriptors,
            transports,
        })
    }
}
