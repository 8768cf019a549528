//! CRC-32 as used by DVB SI sections (ETSI EN 300 468).
//!
//! This is the non-reflected MPEG-2 variant: polynomial `0x04C11DB7`,
//! initial value `0xFFFFFFFF`, MSB-first, no final XOR. The common
//! zlib/reflected CRC-32 is *not* interchangeable with it.

use crc::{CRC_32_MPEG_2, Crc};

const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Checks a complete section: `data` must include the trailing 4 CRC bytes.
///
/// Folding the checksum over payload plus big-endian CRC leaves a running
/// value of zero exactly when the section is intact.
pub fn check(data: &[u8]) -> bool {
    CRC.checksum(data) == 0
}

/// Computes the checksum of `data` for re-encoding a section.
pub fn checksum(data: &[u8]) -> u32 {
    CRC.checksum(data)
}
