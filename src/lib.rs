//! Decoding of DVB service information and MPEG-2 program specific
//! information sections.
//!
//! The crate frames raw section bytes ([`parser::SectionParser`]),
//! validates their CRC, decodes the table a section carries
//! ([`tables::Table`]) and the descriptor loops inside it
//! ([`descriptors::Descriptor`]), reassembles multi-section tables
//! ([`assembler::TableAssembler`]) and fans demultiplexed stream data
//! out to consumers ([`dispatch::StreamDispatcher`]).

pub mod assembler;
pub mod crc32;
pub mod descriptors;
pub mod dispatch;
pub mod error;
pub mod parser;
pub mod reader;
pub mod section;
pub mod tables;
pub mod text;
pub mod time;

pub use error::SiError;
pub use parser::SectionParser;
pub use reader::TableReader;
pub use section::Section;
pub use tables::Table;
