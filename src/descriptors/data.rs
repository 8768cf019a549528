//! Data broadcasting descriptors: object carousels, application
//! signalling and private data scoping.

use bytes::Bytes;

/// Application signalling descriptor (tag `0x6F`), announces interactive
/// applications carried alongside a service.
#[derive(Clone, Debug)]
pub struct ApplicationSignalling {
    /// `(application_type, AIT version)` pairs.
    pub applications: Vec<(u16, u8)>,
}

impl ApplicationSignalling {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        let applications = body
            .chunks_exact(3)
            .map(|entry| {
                let application_type = u16::from_be_bytes([entry[0], entry[1]]) & 0x7FFF;
                (application_type, entry[2] & 0x1F)
            })
            .collect();

        Some(Self { applications })
    }
}

/// Carousel identifier descriptor (tag `0x13`).
#[derive(Clone, Debug)]
pub struct CarouselIdentifier {
    pub carousel_id: u32,
    pub format_id: u8,
    /// Format-specific bytes after the format id.
    pub private_data: Bytes,
}

impl CarouselIdentifier {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 5 {
            return None;
        }

        Some(Self {
            carousel_id: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
            format_id: body[4],
            private_data: body.slice(5..),
        })
    }
}

/// Data broadcast id descriptor (tag `0x66`).
#[derive(Clone, Debug)]
pub struct DataBroadcastId {
    pub data_broadcast_id: u16,
    pub selector: Bytes,
}

impl DataBroadcastId {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 2 {
            return None;
        }

        Some(Self {
            data_broadcast_id: u16::from_be_bytes([body[0], body[1]]),
            selector: body.slice(2..),
        })
    }
}

/// Private data specifier descriptor (tag `0x5F`), scopes the private
/// descriptor tags that follow it in the same loop.
#[derive(Clone, Copy, Debug)]
pub struct PrivateDataSpecifier {
    pub specifier: u32,
}

impl PrivateDataSpecifier {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 4 {
            return None;
        }

        Some(Self {
            specifier: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
        })
    }
}
