//! Descriptors naming and linking services and networks.

use bytes::Bytes;

use crate::text::decode_string;

/// Service descriptor (tag `0x48`): type plus provider and service names.
#[derive(Clone, Debug)]
pub struct Service {
    /// Service type (digital TV, radio, HD simulcast, ...).
    pub service_type: u8,
    pub provider_name: String,
    pub service_name: String,
}

impl Service {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 3 {
            return None;
        }

        let provider_len = body[1] as usize;
        let provider_end = 2 + provider_len;
        if provider_end >= body.len() {
            return None;
        }

        let name_len = body[provider_end] as usize;
        let name_end = provider_end + 1 + name_len;
        if name_end > body.len() {
            return None;
        }

        Some(Self {
            service_type: body[0],
            provider_name: decode_string(&body[2..provider_end]),
            service_name: decode_string(&body[provider_end + 1..name_end]),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceListEntry {
    pub service_id: u16,
    pub service_type: u8,
}

/// Service list descriptor (tag `0x41`), carried in the NIT transport loop.
#[derive(Clone, Debug)]
pub struct ServiceList {
    pub services: Vec<ServiceListEntry>,
}

impl ServiceList {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        let services = body
            .chunks_exact(3)
            .map(|entry| ServiceListEntry {
                service_id: u16::from_be_bytes([entry[0], entry[1]]),
                service_type: entry[2],
            })
            .collect();
        Some(Self { services })
    }
}

/// Network name descriptor (tag `0x40`).
#[derive(Clone, Debug)]
pub struct NetworkName {
    pub name: String,
}

impl NetworkName {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        Some(Self {
            name: decode_string(body),
        })
    }
}

/// Linkage descriptor (tag `0x4A`): redirects to a service on some
/// transport, e.g. for service replacement or EPG data location.
#[derive(Clone, Debug)]
pub struct Linkage {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub service_id: u16,
    pub linkage_type: u8,
    /// Type-specific trailing bytes, undecoded.
    pub private_data: Bytes,
}

impl Linkage {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 7 {
            return None;
        }

        Some(Self {
            transport_stream_id: u16::from_be_bytes([body[0], body[1]]),
            original_network_id: u16::from_be_bytes([body[2], body[3]]),
            service_id: u16::from_be_bytes([body[4], body[5]]),
            linkage_type: body[6],
            private_data: body.slice(7..),
        })
    }
}
