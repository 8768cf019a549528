//! Descriptors attached to program guide events: names, long texts,
//! genre classification and parental ratings.

use bytes::Bytes;

use super::{Descriptor, language_code};
use crate::text::decode_string;

/// Short event descriptor (tag `0x4D`): event name plus a one-line text.
#[derive(Clone, Debug)]
pub struct ShortEvent {
    pub language: String,
    pub name: String,
    pub text: String,
}

impl ShortEvent {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 5 {
            return None;
        }

        let name_len = body[3] as usize;
        let name_end = 4 + name_len;
        if name_end >= body.len() {
            return None;
        }

        let text_len = body[name_end] as usize;
        let text_end = name_end + 1 + text_len;
        if text_end > body.len() {
            return None;
        }

        Some(Self {
            language: language_code(&body[0..3]),
            name: decode_string(&body[4..name_end]),
            text: decode_string(&body[name_end + 1..text_end]),
        })
    }
}

/// One item of an extended event descriptor: a described key/value pair
/// such as "Director: ...".
#[derive(Clone, Debug)]
pub struct ExtendedEventItem {
    pub description: String,
    pub item: String,
}

/// Extended event descriptor (tag `0x4E`).
///
/// A single descriptor is limited to 255 bytes, so long texts span several
/// instances ordered by `number`; [`extended_text`] joins them back.
#[derive(Clone, Debug)]
pub struct ExtendedEvent {
    /// Position of this part within the chain.
    pub number: u8,
    /// Position of the final part within the chain.
    pub last_number: u8,
    pub language: String,
    pub items: Vec<ExtendedEventItem>,
    pub text: String,
}

impl ExtendedEvent {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 6 {
            return None;
        }

        let number = body[0] >> 4;
        let last_number = body[0] & 0x0F;
        let language = language_code(&body[1..4]);

        let items_len = body[4] as usize;
        let items_end = 5 + items_len;
        if items_end >= body.len() {
            return None;
        }

        let mut items = Vec::new();
        let mut offset = 5;
        while offset < items_end {
            let desc_len = body[offset] as usize;
            let desc_end = offset + 1 + desc_len;
            if desc_end >= items_end {
                break;
            }

            let item_len = body[desc_end] as usize;
            let item_end = desc_end + 1 + item_len;
            if item_end > items_end {
                break;
            }

            items.push(ExtendedEventItem {
                description: decode_string(&body[offset + 1..desc_end]),
                item: decode_string(&body[desc_end + 1..item_end]),
            });
            offset = item_end;
        }

        let text_len = body[items_end] as usize;
        let text_end = items_end + 1 + text_len;
        if text_end > body.len() {
            return None;
        }

        Some(Self {
            number,
            last_number,
            language,
            items,
            text: decode_string(&body[items_end + 1..text_end]),
        })
    }
}

/// Joins the text parts of every extended event descriptor in `descriptors`
/// in chain order. `None` when the list carries no extended event.
pub fn extended_text(descriptors: &[Descriptor]) -> Option<String> {
    let mut parts: Vec<&ExtendedEvent> = descriptors
        .iter()
        .filter_map(|d| match d {
            Descriptor::ExtendedEvent(e) => Some(e),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }

    parts.sort_by_key(|e| e.number);
    Some(parts.iter().map(|e| e.text.as_str()).collect())
}

/// One genre classification pair of a content descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentCategory {
    /// Coarse genre nibble (movie, news, sports, ...).
    pub nibble_level_1: u8,
    /// Fine genre nibble within the coarse class.
    pub nibble_level_2: u8,
    /// Broadcaster-defined refinement.
    pub user_byte: u8,
}

/// Content descriptor (tag `0x54`): genre codes for an event.
#[derive(Clone, Debug)]
pub struct Content {
    pub categories: Vec<ContentCategory>,
}

impl Content {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        let categories = body
            .chunks_exact(2)
            .map(|pair| ContentCategory {
                nibble_level_1: pair[0] >> 4,
                nibble_level_2: pair[0] & 0x0F,
                user_byte: pair[1],
            })
            .collect();
        Some(Self { categories })
    }
}

/// One country's rating inside a parental rating descriptor.
#[derive(Clone, Debug)]
pub struct Rating {
    pub country: String,
    /// Raw rating byte; `1..=15` encodes minimum age minus three.
    pub rating: u8,
}

impl Rating {
    /// Minimum recommended age in years, when defined.
    pub fn minimum_age(&self) -> Option<u8> {
        match self.rating {
            1..=15 => Some(self.rating + 3),
            _ => None,
        }
    }
}

/// Parental rating descriptor (tag `0x55`).
#[derive(Clone, Debug)]
pub struct ParentalRating {
    pub ratings: Vec<Rating>,
}

impl ParentalRating {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        let ratings = body
            .chunks_exact(4)
            .map(|entry| Rating {
                country: language_code(&entry[0..3]),
                rating: entry[3],
            })
            .collect();
        Some(Self { ratings })
    }
}
