//! Time and date table (table id `0x70`) and time offset table (`0x73`).
//! Both carry the current UTC time; the TOT adds a descriptor loop and,
//! unlike the TDT, a CRC.

use chrono::{DateTime, Utc};

use super::TableHeader;
use crate::descriptors::DescriptorLoader;
use crate::section::Section;
use crate::time;

/// The broadcast clock, a single undated section repeated continuously.
#[derive(Clone, Debug)]
pub struct Tdt {
    pub header: TableHeader,
    pub time: DateTime<Utc>,
}

impl Tdt {
    pub(crate) fn claims(table_id: u8) -> bool {
        table_id == 0x70
    }

    pub(crate) fn decode(section: &Section) -> Option<Self> {
        let payload = section.payload();
        if payload.len() < 5 {
            return None;
        }

        Some(Self {
            header: TableHeader::single_section(),
            time: time::decode_time(&payload[0..5])?,
        })
    }
}

/// The broadcast clock with local time offset descriptors.
#[derive(Clone, Debug)]
pub struct Tot {
    pub header: TableHeader,
    pub time: DateTime<Utc>,
    pub descriptors: DescriptorLoader,
}

impl Tot {
    pub(crate) fn claims(table_id: u8) -> bool {
        table_id == 0x73
    }

    pub(crate) fn decode(section: &Section) -> Option<Self> {
        let payload = section.payload();
        // Time, loop length and CRC.
        if payload.len() < 11 {
            return None;
        }

        let end = payload.len() - 4;
        let loop_length = (((payload[5] as usize) & 0x0F) << 8) | payload[6] as usize;
        let loop_end = end.min(7 + loop_length);

        Some(Self {
            header: TableHeader::single_section(),
            time: time::decode_time(&payload[0..5])?,
            descriptors: DescriptorLoader::new(payload.slice(7..loop_end)),
        })
    }
}
