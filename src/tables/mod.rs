//! SI table decoding, dispatched on the section's table identifier.
//!
//! Every variant reads its body from the section payload; syntax sections
//! share a five byte prefix (table id extension, version/current byte,
//! section and last section number) that [`TableHeader`] models.

mod cit;
mod eit;
mod nit;
mod pat;
mod pmt;
mod sdt;
mod tdt;

pub use cit::Cit;
pub use eit::{Eit, EventEntry};
pub use nit::{Nit, TransportEntry};
pub use pat::Pat;
pub use pmt::{Pmt, StreamEntry, StreamType};
pub use sdt::{Sdt, ServiceEntry};
pub use tdt::{Tdt, Tot};

use std::sync::LazyLock;

use crate::section::Section;

/// The version and sectioning fields shared by all syntax sections,
/// located at payload bytes 2 to 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableHeader {
    pub version: u8,
    pub is_current: bool,
    pub section_number: u8,
    pub last_section_number: u8,
}

impl TableHeader {
    pub(crate) fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < 5 {
            return None;
        }

        Some(Self {
            version: (payload[2] >> 1) & 0x1F,
            is_current: payload[2] & 0x01 != 0,
            section_number: payload[3],
            last_section_number: payload[4],
        })
    }

    /// Header for the tables that carry no sectioning fields on the wire
    /// (a single section describing everything).
    pub(crate) fn single_section() -> Self {
        Self {
            version: 0,
            is_current: true,
            section_number: 0,
            last_section_number: 0,
        }
    }
}

/// One decoded SI table.
#[derive(Clone, Debug)]
pub enum Table {
    Pat(Pat),
    Pmt(Pmt),
    Sdt(Sdt),
    Eit(Eit),
    Nit(Nit),
    Tdt(Tdt),
    Tot(Tot),
    Cit(Cit),
}

type TableDecodeFn = fn(&Section) -> Option<Table>;

/// Registry row pairing a claim predicate over the table identifier with
/// the decoder invoked for claimed sections.
struct Handler {
    claims: fn(u8) -> bool,
    decode: TableDecodeFn,
}

static HANDLERS: &[Handler] = &[
    Handler { claims: Pat::claims, decode: |s| Pat::decode(s).map(Table::Pat) },
    Handler { claims: Pmt::claims, decode: |s| Pmt::decode(s).map(Table::Pmt) },
    Handler { claims: Sdt::claims, decode: |s| Sdt::decode(s).map(Table::Sdt) },
    Handler { claims: Eit::claims, decode: |s| Eit::decode(s).map(Table::Eit) },
    Handler { claims: Nit::claims, decode: |s| Nit::decode(s).map(Table::Nit) },
    Handler { claims: Tdt::claims, decode: |s| Tdt::decode(s).map(Table::Tdt) },
    Handler { claims: Tot::claims, decode: |s| Tot::decode(s).map(Table::Tot) },
    Handler { claims: Cit::claims, decode: |s| Cit::decode(s).map(Table::Cit) },
];

/// Table id lookup map, built once by probing every handler's claim
/// predicate for each of the 256 possible identifiers.
static DECODER_BY_TABLE_ID: LazyLock<[Option<TableDecodeFn>; 256]> = LazyLock::new(|| {
    let mut map = [None; 256];
    for (id, slot) in map.iter_mut().enumerate() {
        for handler in HANDLERS {
            if (handler.claims)(id as u8) {
                *slot = Some(handler.decode);
                break;
            }
        }
    }
    map
});

impl Table {
    /// Decodes the table carried by `section`, if its identifier is
    /// claimed by a known variant and the body is consistent.
    pub fn decode(section: &Section) -> Option<Table> {
        DECODER_BY_TABLE_ID[section.table_id() as usize].and_then(|decode| decode(section))
    }

    /// Short name of the table kind.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Pat(_) => "PAT",
            Table::Pmt(_) => "PMT",
            Table::Sdt(_) => "SDT",
            Table::Eit(_) => "EIT",
            Table::Nit(_) => "NIT",
            Table::Tdt(_) => "TDT",
            Table::Tot(_) => "TOT",
            Table::Cit(_) => "CIT",
        }
    }

    /// The shared version and sectioning header.
    pub fn header(&self) -> &TableHeader {
        match self {
            Table::Pat(t) => &t.header,
            Table::Pmt(t) => &t.header,
            Table::Sdt(t) => &t.header,
            Table::Eit(t) => &t.header,
            Table::Nit(t) => &t.header,
            Table::Tdt(t) => &t.header,
            Table::Tot(t) => &t.header,
            Table::Cit(t) => &t.header,
        }
    }
}

/// A concrete table kind that can be collected across sections.
///
/// Implementors declare which table identifiers they cover and extract
/// themselves from a decoded [`Table`]; the sectioning header drives
/// multi-section reassembly.
pub trait TableVariant: Sized + Send + 'static {
    /// Whether sections with this table identifier belong to the variant.
    fn claims(table_id: u8) -> bool;

    /// The PID this table kind is broadcast on.
    fn well_known_pid() -> u16;

    fn from_table(table: Table) -> Option<Self>;

    fn header(&self) -> &TableHeader;
}

impl TableVariant for Pat {
    fn claims(table_id: u8) -> bool {
        Pat::claims(table_id)
    }

    fn well_known_pid() -> u16 {
        0x0000
    }

    fn from_table(table: Table) -> Option<Self> {
        match table {
            Table::Pat(pat) => Some(pat),
            _ => None,
        }
    }

    fn header(&self) -> &TableHeader {
        &self.header
    }
}

impl TableVariant for Sdt {
    fn claims(table_id: u8) -> bool {
        Sdt::claims(table_id)
    }

    fn well_known_pid() -> u16 {
        0x0011
    }

    fn from_table(table: Table) -> Option<Self> {
        match table {
            Table::Sdt(sdt) => Some(sdt),
            _ => None,
        }
    }

    fn header(&self) -> &TableHeader {
        &self.header
    }
}

impl TableVariant for Nit {
    fn claims(table_id: u8) -> bool {
        Nit::claims(table_id)
    }

    fn well_known_pid() -> u16 {
        0x0010
    }

    fn from_table(table: Table) -> Option<Self> {
        match table {
            Table::Nit(nit) => Some(nit),
            _ => None,
        }
    }

    fn header(&self) -> &TableHeader {
        &self.header
    }
}

impl TableVariant for Eit {
    fn claims(table_id: u8) -> bool {
        Eit::claims(table_id)
    }

    fn well_known_pid() -> u16 {
        0x0012
    }

    fn from_table(table: Table) -> Option<Self> {
        match table {
            Table::Eit(eit) => Some(eit),
            _ => None,
        }
    }

    fn header(&self) -> &TableHeader {
        &self.header
    }
}

impl TableVariant for Pmt {
    fn claims(table_id: u8) -> bool {
        Pmt::claims(table_id)
    }

    /// The PMT has no fixed PID; the PAT assigns one per program.
    fn well_known_pid() -> u16 {
        0x1FFF
    }

    fn from_table(table: Table) -> Option<Self> {
        match table {
            Table::Pmt(pmt) => Some(pmt),
            _ => None,
        }
    }

    fn header(&self) -> &TableHeader {
        &self.header
    }
}
