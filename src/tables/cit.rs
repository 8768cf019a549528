//! Premiere content information table (private table id `0xA0`), the
//! pay-per-view guide format: one section per content item, with the
//! schedule carried in private descriptors.

use chrono::Duration;

use super::TableHeader;
use crate::descriptors::DescriptorLoader;
use crate::section::Section;
use crate::time;

#[derive(Clone, Debug)]
pub struct Cit {
    pub header: TableHeader,
    pub content_id: u32,
    pub duration: Option<Duration>,
    pub descriptors: DescriptorLoader,
}

impl Cit {
    pub(crate) fn claims(table_id: u8) -> bool {
        table_id == 0xA0
    }

    pub(crate) fn decode(section: &Section) -> Option<Self> {
        if !section.syntax() {
            return None;
        }

        let payload = section.payload();
        let header = TableHeader::decode(payload)?;
        if payload.len() < 18 {
            return None;
        }

        let end = payload.len() - 4;
        let loop_length = (((payload[12] as usize) & 0x0F) << 8) | payload[13] as usize;
        let loop_end = end.min(14 + loop_length);

        Some(Self {
            header,
            content_id: u32::from_be_bytes([payload[5], payload[6], payload[7], payload[8]]),
            duration: time::decode_duration(&payload[9..12]),
            descriptors: DescriptorLoader::new(payload.slice(14..loop_end)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::Descriptor;
    use crate::section::{FrameOutcome, Section, encode_section};

    #[test]
    fn content_item_with_description() {
        let body = [
            0x00, 0x00, 0xC1, 0x00, 0x00, //
            0x00, 0x01, 0xE2, 0x40, // content id
            0x01, 0x45, 0x00, // runs 1h45m
            0xF0, 0x09, // descriptor loop
            0x4D, 0x07, b'd', b'e', b'u', 0x02, b'T', b'V', 0x00,
        ];
        let wire = encode_section(0xA0, true, &body);

        let cit = match Section::frame(&wire) {
            FrameOutcome::Framed(section) => match section.into_table() {
                Some(crate::tables::Table::Cit(cit)) => cit,
                other => panic!("unexpected {other:?}"),
            },
            _ => panic!("expected a framed section"),
        };

        assert_eq!(cit.content_id, 0x0001E240);
        assert_eq!(cit.duration, Some(Duration::minutes(105)));
        match &cit.descriptors.descriptors()[0] {
            Descriptor::ShortEvent(short) => assert_eq!(short.name, "TV"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
