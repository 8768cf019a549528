//! Event information table (table ids `0x4E` to `0x6F`): the programme
//! guide. Id `0x4E`/`0x4F` carry present/following events, the two
//! sixteen-id blocks above them the full schedule.

use std::cell::OnceCell;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};

use super::TableHeader;
use crate::descriptors::{Descriptor, DescriptorLoader, ShortEvent};
use crate::section::Section;
use crate::time;

#[derive(Clone, Debug)]
pub struct Eit {
    pub table_id: u8,
    pub header: TableHeader,
    pub service_id: u16,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub segment_last_section_number: u8,
    pub last_table_id: u8,
    pub events: Vec<EventEntry>,
}

/// One guide event. Start time and duration decode on first access; a
/// consumer scanning for a single event id never pays for the rest.
#[derive(Clone)]
pub struct EventEntry {
    pub event_id: u16,
    pub running_status: u8,
    pub is_scrambled: bool,
    pub descriptors: DescriptorLoader,
    raw_time: Bytes,
    start_time: OnceCell<Option<DateTime<Utc>>>,
    duration: OnceCell<Option<Duration>>,
}

impl EventEntry {
    fn decode(data: &Bytes) -> Option<(Self, usize)> {
        if data.len() < 12 {
            return None;
        }

        let info_length = (((data[10] as usize) & 0x0F) << 8) | data[11] as usize;
        if 12 + info_length > data.len() {
            return None;
        }

        let entry = Self {
            event_id: u16::from_be_bytes([data[0], data[1]]),
            running_status: data[10] >> 5,
            is_scrambled: data[10] & 0x10 != 0,
            descriptors: DescriptorLoader::new(data.slice(12..12 + info_length)),
            raw_time: data.slice(2..10),
            start_time: OnceCell::new(),
            duration: OnceCell::new(),
        };
        Some((entry, 12 + info_length))
    }

    /// Event start in UTC, `None` for the undefined all-ones encoding.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        *self
            .start_time
            .get_or_init(|| time::decode_time(&self.raw_time[0..5]))
    }

    pub fn duration(&self) -> Option<Duration> {
        *self
            .duration
            .get_or_init(|| time::decode_duration(&self.raw_time[5..8]))
    }

    /// The short event descriptor, holding name and synopsis.
    pub fn short_event(&self) -> Option<&ShortEvent> {
        self.descriptors.descriptors().iter().find_map(|d| match d {
            Descriptor::ShortEvent(short) => Some(short),
            _ => None,
        })
    }
}

impl std::fmt::Debug for EventEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEntry")
            .field("event_id", &self.event_id)
            .field("running_status", &self.running_status)
            .field("start_time", &self.start_time())
            .field("duration", &self.duration())
            .finish()
    }
}

impl Eit {
    pub(crate) fn claims(table_id: u8) -> bool {
        (0x4E..=0x6F).contains(&table_id)
    }

    pub(crate) fn decode(section: &Section) -> Option<Self> {
        if !section.syntax() {
            return None;
        }

        let payload = section.payload();
        let header = TableHeader::decode(payload)?;
        if payload.len() < 15 {
            return None;
        }

        let end = payload.len() - 4;
        let mut events = Vec::new();
        let mut offset = 11usize;
        while offset < end {
            let Some((entry, consumed)) = EventEntry::decode(&payload.slice(offset..end))
            else {
                break;
            };
            events.push(entry);
            offset += consumed;
        }

        Some(Self {
            table_id: section.table_id(),
            header,
            service_id: u16::from_be_bytes([payload[0], payload[1]]),
            transport_stream_id: u16::from_be_bytes([payload[5], payload[6]]),
            original_network_id: u16::from_be_bytes([payload[7], payload[8]]),
            segment_last_section_number: payload[9],
            last_table_id: payload[10],
            events,
        })
    }

    /// Whether the events describe the transport stream being received.
    pub fn is_actual(&self) -> bool {
        self.table_id == 0x4E || (0x50..=0x5F).contains(&self.table_id)
    }

    /// Whether this is schedule data rather than present/following.
    pub fn is_schedule(&self) -> bool {
        self.table_id >= 0x50
    }
}
