//! Service description table (table ids `0x42` and `0x46`): the services
//! of the actual or another transport stream, with names carried in
//! service descriptors.

use bytes::Bytes;

use super::TableHeader;
use crate::descriptors::{Descriptor, DescriptorLoader};
use crate::section::Section;

#[derive(Clone, Debug)]
pub struct Sdt {
    pub header: TableHeader,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    /// Set for table id `0x42`, the transport stream being received.
    pub is_actual: bool,
    pub services: Vec<ServiceEntry>,
}

/// One service of the transport stream.
#[derive(Clone, Debug)]
pub struct ServiceEntry {
    pub service_id: u16,
    pub has_eit_schedule: bool,
    pub has_eit_present_following: bool,
    pub running_status: u8,
    pub is_scrambled: bool,
    pub descriptors: DescriptorLoader,
}

impl ServiceEntry {
    fn decode(data: &Bytes) -> Option<(Self, usize)> {
        if data.len() < 5 {
            return None;
        }

        let info_length = (((data[3] as usize) & 0x0F) << 8) | data[4] as usize;
        if 5 + info_length > data.len() {
            return None;
        }

        let entry = Self {
            service_id: u16::from_be_bytes([data[0], data[1]]),
            has_eit_schedule: data[2] & 0x02 != 0,
            has_eit_present_following: data[2] & 0x01 != 0,
            running_status: data[3] >> 5,
            is_scrambled: data[3] & 0x10 != 0,
            descriptors: DescriptorLoader::new(data.slice(5..5 + info_length)),
        };
        Some((entry, 5 + info_length))
    }

    /// The service descriptor of this entry, if present.
    pub fn service(&self) -> Option<&crate::descriptors::Service> {
        self.descriptors.descriptors().iter().find_map(|d| match d {
            Descriptor::Service(service) => Some(service),
            _ => None,
        })
    }
}

impl Sdt {
    pub(crate) fn claims(table_id: u8) -> bool {
        table_id == 0x42 || table_id == 0x46
    }

    pub(crate) fn decode(section: &Section) -> Option<Self> {
        if !section.syntax() {
            return None;
        }

        let payload = section.payload();
        let header = TableHeader::decode(payload)?;
        if payload.len() < 12 {
            return None;
        }

        let end = payload.len() - 4;
        let mut services = Vec::new();
        let mut offset = 8usize;
        while offset < end {
            let Some((entry, consumed)) = ServiceEntry::decode(&payload.slice(offset..end))
            else {
                break;
            };
            services.push(entry);
            offset += consumed;
        }

        Some(Self {
            header,
            transport_stream_id: u16::from_be_bytes([payload[0], payload[1]]),
            original_network_id: u16::from_be_bytes([payload[5], payload[6]]),
            is_actual: section.table_id() == 0x42,
            services,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{FrameOutcome, Section, encode_section};

    fn decode(table_id: u8, body: &[u8]) -> Sdt {
        let wire = encode_section(table_id, true, body);
        match Section::frame(&wire) {
            FrameOutcome::Framed(section) => match section.into_table() {
                Some(crate::tables::Table::Sdt(sdt)) => sdt,
                other => panic!("unexpected {other:?}"),
            },
            _ => panic!("expected a framed section"),
        }
    }

    #[test]
    fn service_entry_with_name() {
        let sdt = decode(
            0x42,
            &[
                0x00, 0x01, 0xC1, 0x00, 0x00, // transport stream 1
                0x00, 0x55, 0xFF, // original network 0x55
                0x00, 0x0A, 0xFD, 0x90, 0x0B, // service 10, running, scrambled
                0x48, 0x09, 0x01, 0x03, b'A', b'B', b'C', 0x03, b'O', b'n', b'e',
            ],
        );

        assert!(sdt.is_actual);
        assert_eq!(sdt.original_network_id, 0x55);
        assert_eq!(sdt.services.len(), 1);

        let entry = &sdt.services[0];
        assert_eq!(entry.service_id, 10);
        assert!(entry.has_eit_present_following);
        assert!(entry.is_scrambled);
        assert_eq!(entry.running_status, 4);

        let service = entry.service().unwrap();
        assert_eq!(service.provider_name, "ABC");
        assert_eq!(service.service_name, "One");
    }

    #[test]
    fn other_transport_stream_flag() {
        let sdt = decode(0x46, &[0x00, 0x02, 0xC1, 0x00, 0x00, 0x00, 0x55, 0xFF]);
        assert!(!sdt.is_actual);
        assert!(sdt.services.is_empty());
    }
}
