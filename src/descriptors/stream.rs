//! Descriptors attached to elementary streams: component and language
//! tagging, audio codec parameters, subtitles and teletext pages.

use bytes::Bytes;

use super::language_code;
use crate::text;

/// Component descriptor (tag `0x50`).
#[derive(Clone, Debug)]
pub struct Component {
    pub stream_content: u8,
    pub component_type: u8,
    pub component_tag: u8,
    pub language: String,
    pub text: String,
}

impl Component {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 6 {
            return None;
        }

        Some(Self {
            stream_content: body[0] & 0x0F,
            component_type: body[1],
            component_tag: body[2],
            language: language_code(&body[3..6]),
            text: text::decode_string(&body[6..]),
        })
    }
}

/// Stream identifier descriptor (tag `0x52`), links a PMT stream to the
/// component descriptors of the EIT.
#[derive(Clone, Copy, Debug)]
pub struct StreamIdentifier {
    pub component_tag: u8,
}

impl StreamIdentifier {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.is_empty() {
            return None;
        }

        Some(Self {
            component_tag: body[0],
        })
    }
}

/// One language of an [`IsoLanguage`] descriptor.
#[derive(Clone, Debug)]
pub struct LanguageEntry {
    pub language: String,
    pub audio_type: u8,
}

/// ISO 639 language descriptor (tag `0x0A`).
#[derive(Clone, Debug)]
pub struct IsoLanguage {
    pub languages: Vec<LanguageEntry>,
}

impl IsoLanguage {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        let languages = body
            .chunks_exact(4)
            .map(|entry| LanguageEntry {
                language: language_code(&entry[0..3]),
                audio_type: entry[3],
            })
            .collect();

        Some(Self { languages })
    }
}

/// AC-3 descriptor (tag `0x6A`). All fields past the flag byte are
/// optional on the wire.
#[derive(Clone, Copy, Debug)]
pub struct Ac3 {
    pub component_type: Option<u8>,
    pub bsid: Option<u8>,
    pub mainid: Option<u8>,
    pub asvc: Option<u8>,
}

impl Ac3 {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.is_empty() {
            return None;
        }

        let flags = body[0];
        let mut offset = 1usize;
        let mut next = |present: bool| -> Option<u8> {
            if !present {
                return None;
            }
            let value = body.get(offset).copied();
            offset += 1;
            value
        };

        Some(Self {
            component_type: next(flags & 0x80 != 0),
            bsid: next(flags & 0x40 != 0),
            mainid: next(flags & 0x20 != 0),
            asvc: next(flags & 0x10 != 0),
        })
    }
}

/// AAC descriptor (tag `0x7C`).
#[derive(Clone, Copy, Debug)]
pub struct Aac {
    pub profile_and_level: u8,
    pub aac_type: Option<u8>,
}

impl Aac {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.is_empty() {
            return None;
        }

        let aac_type = match body.get(1) {
            Some(flags) if flags & 0x80 != 0 => body.get(2).copied(),
            _ => None,
        };

        Some(Self {
            profile_and_level: body[0],
            aac_type,
        })
    }
}

/// One page of a [`Subtitling`] descriptor.
#[derive(Clone, Debug)]
pub struct SubtitlingEntry {
    pub language: String,
    pub subtitling_type: u8,
    pub composition_page_id: u16,
    pub ancillary_page_id: u16,
}

/// Subtitling descriptor (tag `0x59`).
#[derive(Clone, Debug)]
pub struct Subtitling {
    pub subtitles: Vec<SubtitlingEntry>,
}

impl Subtitling {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        let subtitles = body
            .chunks_exact(8)
            .map(|entry| SubtitlingEntry {
                language: language_code(&entry[0..3]),
                subtitling_type: entry[3],
                composition_page_id: u16::from_be_bytes([entry[4], entry[5]]),
                ancillary_page_id: u16::from_be_bytes([entry[6], entry[7]]),
            })
            .collect();

        Some(Self { subtitles })
    }
}

/// One page of a [`Teletext`] descriptor.
#[derive(Clone, Debug)]
pub struct TeletextEntry {
    pub language: String,
    pub teletext_type: u8,
    pub magazine: u8,
    /// Page number within the magazine, two BCD-style hex digits.
    pub page: u8,
}

/// Teletext descriptor (tag `0x56`).
#[derive(Clone, Debug)]
pub struct Teletext {
    pub pages: Vec<TeletextEntry>,
}

impl Teletext {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        let pages = body
            .chunks_exact(5)
            .map(|entry| TeletextEntry {
                language: language_code(&entry[0..3]),
                teletext_type: entry[3] >> 3,
                magazine: entry[3] & 0x07,
                page: entry[4],
            })
            .collect();

        Some(Self { pages })
    }
}
