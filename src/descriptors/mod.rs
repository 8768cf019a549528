//! Tag-dispatched decoding of SI descriptors (ETSI EN 300 468 chapter 6).
//!
//! A descriptor is a 1-byte tag, a 1-byte length and that many payload
//! bytes. Tables and their entries carry descriptor loops; [`load`]
//! walks such a loop, dispatching each tag through a fixed registry.

mod data;
mod delivery;
mod event;
mod service;
mod stream;

pub use data::{ApplicationSignalling, CarouselIdentifier, DataBroadcastId, PrivateDataSpecifier};
pub use delivery::{
    CableDelivery, Cell, CellFrequencyLink, CellList, FrequencyLink, FrequencyList,
    SatelliteDelivery, Subcell, TerrestrialDelivery,
};
pub use event::{Content, ContentCategory, ExtendedEvent, ParentalRating, Rating, ShortEvent};
pub use event::extended_text;
pub use service::{Linkage, NetworkName, Service, ServiceList, ServiceListEntry};
pub use stream::{
    Ac3, Aac, Component, IsoLanguage, LanguageEntry, StreamIdentifier, Subtitling, SubtitlingEntry,
    Teletext, TeletextEntry,
};

use std::cell::OnceCell;
use std::sync::LazyLock;

use bytes::Bytes;

/// Descriptor tags as assigned by ETSI EN 300 468 (plus the MPEG-defined
/// ones this crate understands).
pub mod tag {
    pub const ISO_LANGUAGE: u8 = 0x0A;
    pub const CAROUSEL_IDENTIFIER: u8 = 0x13;
    pub const NETWORK_NAME: u8 = 0x40;
    pub const SERVICE_LIST: u8 = 0x41;
    pub const SATELLITE_DELIVERY: u8 = 0x43;
    pub const CABLE_DELIVERY: u8 = 0x44;
    pub const SERVICE: u8 = 0x48;
    pub const LINKAGE: u8 = 0x4A;
    pub const SHORT_EVENT: u8 = 0x4D;
    pub const EXTENDED_EVENT: u8 = 0x4E;
    pub const COMPONENT: u8 = 0x50;
    pub const STREAM_IDENTIFIER: u8 = 0x52;
    pub const CONTENT: u8 = 0x54;
    pub const PARENTAL_RATING: u8 = 0x55;
    pub const TELETEXT: u8 = 0x56;
    pub const SUBTITLING: u8 = 0x59;
    pub const TERRESTRIAL_DELIVERY: u8 = 0x5A;
    pub const PRIVATE_DATA_SPECIFIER: u8 = 0x5F;
    pub const FREQUENCY_LIST: u8 = 0x62;
    pub const DATA_BROADCAST_ID: u8 = 0x66;
    pub const AC3: u8 = 0x6A;
    pub const CELL_LIST: u8 = 0x6C;
    pub const CELL_FREQUENCY_LINK: u8 = 0x6D;
    pub const APPLICATION_SIGNALLING: u8 = 0x6F;
    pub const AAC: u8 = 0x7C;
}

/// One decoded descriptor.
///
/// Tags no variant claims end up as [`Descriptor::Generic`] with the raw
/// body preserved; a claimed tag whose body does not decode becomes
/// [`Descriptor::Invalid`].
#[derive(Clone, Debug)]
pub enum Descriptor {
    ShortEvent(ShortEvent),
    ExtendedEvent(ExtendedEvent),
    Content(Content),
    ParentalRating(ParentalRating),
    Component(Component),
    StreamIdentifier(StreamIdentifier),
    IsoLanguage(IsoLanguage),
    Ac3(Ac3),
    Aac(Aac),
    Subtitling(Subtitling),
    Teletext(Teletext),
    Service(Service),
    ServiceList(ServiceList),
    NetworkName(NetworkName),
    Linkage(Linkage),
    CableDelivery(CableDelivery),
    SatelliteDelivery(SatelliteDelivery),
    TerrestrialDelivery(TerrestrialDelivery),
    FrequencyList(FrequencyList),
    CellList(CellList),
    CellFrequencyLink(CellFrequencyLink),
    ApplicationSignalling(ApplicationSignalling),
    CarouselIdentifier(CarouselIdentifier),
    DataBroadcastId(DataBroadcastId),
    PrivateDataSpecifier(PrivateDataSpecifier),
    Generic(GenericDescriptor),
    Invalid(GenericDescriptor),
}

/// Raw fallback for unclaimed or undecodable tags.
#[derive(Clone, Debug)]
pub struct GenericDescriptor {
    pub tag: u8,
    pub data: Bytes,
}

type DecodeFn = fn(&Bytes) -> Option<Descriptor>;

/// One registry row: a claim predicate over the tag byte plus the decoder
/// for the claimed tags.
struct Handler {
    claims: fn(u8) -> bool,
    decode: DecodeFn,
}

/// The fixed handler list. Order matters only where claims overlap; these
/// do not.
static HANDLERS: &[Handler] = &[
    Handler { claims: |t| t == tag::SHORT_EVENT, decode: |b| ShortEvent::decode(b).map(Descriptor::ShortEvent) },
    Handler { claims: |t| t == tag::EXTENDED_EVENT, decode: |b| ExtendedEvent::decode(b).map(Descriptor::ExtendedEvent) },
    Handler { claims: |t| t == tag::CONTENT, decode: |b| Content::decode(b).map(Descriptor::Content) },
    Handler { claims: |t| t == tag::PARENTAL_RATING, decode: |b| ParentalRating::decode(b).map(Descriptor::ParentalRating) },
    Handler { claims: |t| t == tag::COMPONENT, decode: |b| Component::decode(b).map(Descriptor::Component) },
    Handler { claims: |t| t == tag::STREAM_IDENTIFIER, decode: |b| StreamIdentifier::decode(b).map(Descriptor::StreamIdentifier) },
    Handler { claims: |t| t == tag::ISO_LANGUAGE, decode: |b| IsoLanguage::decode(b).map(Descriptor::IsoLanguage) },
    Handler { claims: |t| t == tag::AC3, decode: |b| Ac3::decode(b).map(Descriptor::Ac3) },
    Handler { claims: |t| t == tag::AAC, decode: |b| Aac::decode(b).map(Descriptor::Aac) },
    Handler { claims: |t| t == tag::SUBTITLING, decode: |b| Subtitling::decode(b).map(Descriptor::Subtitling) },
    Handler { claims: |t| t == tag::TELETEXT, decode: |b| Teletext::decode(b).map(Descriptor::Teletext) },
    Handler { claims: |t| t == tag::SERVICE, decode: |b| Service::decode(b).map(Descriptor::Service) },
    Handler { claims: |t| t == tag::SERVICE_LIST, decode: |b| ServiceList::decode(b).map(Descriptor::ServiceList) },
    Handler { claims: |t| t == tag::NETWORK_NAME, decode: |b| NetworkName::decode(b).map(Descriptor::NetworkName) },
    Handler { claims: |t| t == tag::LINKAGE, decode: |b| Linkage::decode(b).map(Descriptor::Linkage) },
    Handler { claims: |t| t == tag::CABLE_DELIVERY, decode: |b| CableDelivery::decode(b).map(Descriptor::CableDelivery) },
    Handler { claims: |t| t == tag::SATELLITE_DELIVERY, decode: |b| SatelliteDelivery::decode(b).map(Descriptor::SatelliteDelivery) },
    Handler { claims: |t| t == tag::TERRESTRIAL_DELIVERY, decode: |b| TerrestrialDelivery::decode(b).map(Descriptor::TerrestrialDelivery) },
    Handler { claims: |t| t == tag::FREQUENCY_LIST, decode: |b| FrequencyList::decode(b).map(Descriptor::FrequencyList) },
    Handler { claims: |t| t == tag::CELL_LIST, decode: |b| CellList::decode(b).map(Descriptor::CellList) },
    Handler { claims: |t| t == tag::CELL_FREQUENCY_LINK, decode: |b| CellFrequencyLink::decode(b).map(Descriptor::CellFrequencyLink) },
    Handler { claims: |t| t == tag::APPLICATION_SIGNALLING, decode: |b| ApplicationSignalling::decode(b).map(Descriptor::ApplicationSignalling) },
    Handler { claims: |t| t == tag::CAROUSEL_IDENTIFIER, decode: |b| CarouselIdentifier::decode(b).map(Descriptor::CarouselIdentifier) },
    Handler { claims: |t| t == tag::DATA_BROADCAST_ID, decode: |b| DataBroadcastId::decode(b).map(Descriptor::DataBroadcastId) },
    Handler { claims: |t| t == tag::PRIVATE_DATA_SPECIFIER, decode: |b| PrivateDataSpecifier::decode(b).map(Descriptor::PrivateDataSpecifier) },
];

/// Tag lookup map, built once at first use by probing every handler's
/// claim predicate for each of the 256 possible tags.
static DECODER_BY_TAG: LazyLock<[Option<DecodeFn>; 256]> = LazyLock::new(|| {
    let mut map = [None; 256];
    for (tag, slot) in map.iter_mut().enumerate() {
        for handler in HANDLERS {
            if (handler.claims)(tag as u8) {
                *slot = Some(handler.decode);
                break;
            }
        }
    }
    map
});

impl Descriptor {
    /// Decodes a single descriptor body for `tag`.
    pub fn decode(tag: u8, body: Bytes) -> Descriptor {
        match DECODER_BY_TAG[tag as usize] {
            Some(decode) => decode(&body)
                .unwrap_or(Descriptor::Invalid(GenericDescriptor { tag, data: body })),
            None => Descriptor::Generic(GenericDescriptor { tag, data: body }),
        }
    }

    /// The wire tag of this descriptor.
    pub fn tag(&self) -> u8 {
        match self {
            Descriptor::ShortEvent(_) => tag::SHORT_EVENT,
            Descriptor::ExtendedEvent(_) => tag::EXTENDED_EVENT,
            Descriptor::Content(_) => tag::CONTENT,
            Descriptor::ParentalRating(_) => tag::PARENTAL_RATING,
            Descriptor::Component(_) => tag::COMPONENT,
            Descriptor::StreamIdentifier(_) => tag::STREAM_IDENTIFIER,
            Descriptor::IsoLanguage(_) => tag::ISO_LANGUAGE,
            Descriptor::Ac3(_) => tag::AC3,
            Descriptor::Aac(_) => tag::AAC,
            Descriptor::Subtitling(_) => tag::SUBTITLING,
            Descriptor::Teletext(_) => tag::TELETEXT,
            Descriptor::Service(_) => tag::SERVICE,
            Descriptor::ServiceList(_) => tag::SERVICE_LIST,
            Descriptor::NetworkName(_) => tag::NETWORK_NAME,
            Descriptor::Linkage(_) => tag::LINKAGE,
            Descriptor::CableDelivery(_) => tag::CABLE_DELIVERY,
            Descriptor::SatelliteDelivery(_) => tag::SATELLITE_DELIVERY,
            Descriptor::TerrestrialDelivery(_) => tag::TERRESTRIAL_DELIVERY,
            Descriptor::FrequencyList(_) => tag::FREQUENCY_LIST,
            Descriptor::CellList(_) => tag::CELL_LIST,
            Descriptor::CellFrequencyLink(_) => tag::CELL_FREQUENCY_LINK,
            Descriptor::ApplicationSignalling(_) => tag::APPLICATION_SIGNALLING,
            Descriptor::CarouselIdentifier(_) => tag::CAROUSEL_IDENTIFIER,
            Descriptor::DataBroadcastId(_) => tag::DATA_BROADCAST_ID,
            Descriptor::PrivateDataSpecifier(_) => tag::PRIVATE_DATA_SPECIFIER,
            Descriptor::Generic(raw) | Descriptor::Invalid(raw) => raw.tag,
        }
    }
}

/// Walks a descriptor loop.
///
/// Decoding stops silently once no further tag/length header fits or a
/// declared length exceeds the remaining budget; trailing bytes are
/// treated as padding, never read past and never reported as an error.
pub fn load(raw: &Bytes) -> Vec<Descriptor> {
    let mut all = Vec::new();
    let mut offset = 0usize;

    loop {
        let remaining = raw.len() - offset;
        if remaining < 2 {
            break;
        }

        let tag = raw[offset];
        let length = raw[offset + 1] as usize;
        if 2 + length > remaining {
            break;
        }

        let body = raw.slice(offset + 2..offset + 2 + length);
        all.push(Descriptor::decode(tag, body));

        offset += 2 + length;
    }

    all
}

/// Delayed descriptor-loop decoding with a per-entry memoization cell.
///
/// Entries never inspected never pay the decode cost; the first access
/// materializes the list once.
#[derive(Clone)]
pub struct DescriptorLoader {
    raw: Bytes,
    cell: OnceCell<Vec<Descriptor>>,
}

impl DescriptorLoader {
    pub(crate) fn new(raw: Bytes) -> Self {
        Self {
            raw,
            cell: OnceCell::new(),
        }
    }

    /// The decoded descriptor list, materialized on first access.
    pub fn descriptors(&self) -> &[Descriptor] {
        self.cell.get_or_init(|| load(&self.raw))
    }

    /// Size of the undecoded loop in bytes.
    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }
}

impl std::fmt::Debug for DescriptorLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorLoader")
            .field("raw_len", &self.raw.len())
            .field("decoded", &self.cell.get().is_some())
            .finish()
    }
}

/// Reads a 3-character ISO 639 language code.
pub(crate) fn language_code(raw: &[u8]) -> String {
    raw.iter()
        .take(3)
        .map(|&b| if b.is_ascii_graphic() { b as char } else { ' ' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_keeps_raw_bytes() {
        let raw = Bytes::from_static(&[0x80, 0x02, 0xAB, 0xCD]);
        let all = load(&raw);
        assert_eq!(all.len(), 1);
        match &all[0] {
            Descriptor::Generic(generic) => {
                assert_eq!(generic.tag, 0x80);
                assert_eq!(&generic.data[..], &[0xAB, 0xCD]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn truncated_loop_stops_at_boundary() {
        // Second descriptor declares 0x20 bytes, only 1 remains.
        let raw = Bytes::from_static(&[0x52, 0x01, 0x07, 0x6A, 0x20, 0xFF]);
        let all = load(&raw);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tag(), tag::STREAM_IDENTIFIER);
    }

    #[test]
    fn trailing_padding_is_tolerated() {
        let raw = Bytes::from_static(&[0x52, 0x01, 0x07, 0x00]);
        assert_eq!(load(&raw).len(), 1);
    }

    #[test]
    fn malformed_claimed_tag_yields_invalid() {
        // Stream identifier with an empty body cannot decode.
        let raw = Bytes::from_static(&[0x52, 0x00]);
        let all = load(&raw);
        assert!(matches!(all[0], Descriptor::Invalid(_)));
    }

    #[test]
    fn loader_memoizes_once() {
        let loader = DescriptorLoader::new(Bytes::from_static(&[0x52, 0x01, 0x07]));
        let first = loader.descriptors().as_ptr();
        let second = loader.descriptors().as_ptr();
        assert_eq!(first, second);
        assert_eq!(loader.descriptors().len(), 1);
    }
}
