//! Delivery system descriptors: tuning parameters for cable, satellite
//! and terrestrial transports plus the frequency and cell lists used for
//! network handover.

use bytes::Bytes;

use crate::time::from_bcd;

/// Folds packed BCD bytes into the plain decimal value they spell.
fn bcd_value(raw: &[u8]) -> u64 {
    raw.iter()
        .fold(0u64, |acc, &b| acc * 100 + from_bcd(b) as u64)
}

/// Cable delivery system descriptor (tag `0x44`).
#[derive(Clone, Debug)]
pub struct CableDelivery {
    /// Centre frequency in Hz.
    pub frequency: u64,
    pub fec_outer: u8,
    pub modulation: u8,
    /// Symbol rate in symbols per second.
    pub symbol_rate: u64,
    pub fec_inner: u8,
}

impl CableDelivery {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 11 {
            return None;
        }

        // Frequency is 8 BCD digits in units of 100 Hz, the symbol rate
        // 7 digits in units of 100 symbols/s sharing its last byte with
        // the inner FEC nibble.
        Some(Self {
            frequency: bcd_value(&body[0..4]) * 100,
            fec_outer: body[5] & 0x0F,
            modulation: body[6],
            symbol_rate: symbol_rate(&body[7..11]),
            fec_inner: body[10] & 0x0F,
        })
    }
}

/// Satellite delivery system descriptor (tag `0x43`).
#[derive(Clone, Debug)]
pub struct SatelliteDelivery {
    /// Centre frequency in kHz.
    pub frequency: u64,
    /// Orbital position in tenths of a degree.
    pub orbital_position: u16,
    pub west_east: bool,
    pub polarization: u8,
    /// DVB-S2 roll-off, meaningful only with `modulation_system` set.
    pub roll_off: u8,
    /// Set for DVB-S2.
    pub modulation_system: bool,
    pub modulation_type: u8,
    /// Symbol rate in symbols per second.
    pub symbol_rate: u64,
    pub fec_inner: u8,
}

impl SatelliteDelivery {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 11 {
            return None;
        }

        let flags = body[6];
        Some(Self {
            // 8 BCD digits in units of 10 kHz.
            frequency: bcd_value(&body[0..4]) * 10,
            orbital_position: bcd_value(&body[4..6]) as u16,
            west_east: flags & 0x80 != 0,
            polarization: (flags >> 5) & 0x03,
            roll_off: (flags >> 3) & 0x03,
            modulation_system: flags & 0x04 != 0,
            modulation_type: flags & 0x03,
            symbol_rate: symbol_rate(&body[7..11]),
            fec_inner: body[10] & 0x0F,
        })
    }
}

/// 7 BCD digits in units of 100 symbols/s; the last nibble belongs to the
/// inner FEC field.
fn symbol_rate(raw: &[u8]) -> u64 {
    let digits = bcd_value(&raw[0..3]) * 10 + (raw[3] >> 4) as u64;
    digits * 100
}

/// Terrestrial delivery system descriptor (tag `0x5A`).
#[derive(Clone, Debug)]
pub struct TerrestrialDelivery {
    /// Centre frequency in Hz.
    pub frequency: u64,
    pub bandwidth: u8,
    pub is_high_priority: bool,
    pub time_slicing: bool,
    pub mpe_fec: bool,
    pub constellation: u8,
    pub hierarchy: u8,
    pub code_rate_high_priority: u8,
    pub code_rate_low_priority: u8,
    pub guard_interval: u8,
    pub transmission_mode: u8,
    pub other_frequency_in_use: bool,
}

impl TerrestrialDelivery {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.len() < 11 {
            return None;
        }

        // Binary centre frequency in units of 10 Hz, not BCD.
        let frequency =
            u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as u64 * 10;

        Some(Self {
            frequency,
            bandwidth: body[4] >> 5,
            is_high_priority: body[4] & 0x10 != 0,
            time_slicing: body[4] & 0x08 == 0,
            mpe_fec: body[4] & 0x04 == 0,
            constellation: body[5] >> 6,
            hierarchy: (body[5] >> 3) & 0x07,
            code_rate_high_priority: body[5] & 0x07,
            code_rate_low_priority: body[6] >> 5,
            guard_interval: (body[6] >> 3) & 0x03,
            transmission_mode: (body[6] >> 1) & 0x03,
            other_frequency_in_use: body[6] & 0x01 != 0,
        })
    }
}

/// Frequency list descriptor (tag `0x62`).
#[derive(Clone, Debug)]
pub struct FrequencyList {
    /// 1 = satellite, 2 = cable, 3 = terrestrial coding of the entries.
    pub coding_type: u8,
    /// Centre frequencies, raw 32-bit coded values in coding-type units.
    pub frequencies: Vec<u32>,
}

impl FrequencyList {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        if body.is_empty() {
            return None;
        }

        let frequencies = body[1..]
            .chunks_exact(4)
            .map(|f| u32::from_be_bytes([f[0], f[1], f[2], f[3]]))
            .collect();

        Some(Self {
            coding_type: body[0] & 0x03,
            frequencies,
        })
    }
}

/// Coverage subcell inside a [`Cell`].
#[derive(Clone, Copy, Debug)]
pub struct Subcell {
    pub cell_id_extension: u8,
    pub latitude: u16,
    pub longitude: u16,
    pub extent_of_latitude: u16,
    pub extent_of_longitude: u16,
}

/// One coverage cell of a cell list descriptor.
#[derive(Clone, Debug)]
pub struct Cell {
    pub cell_id: u16,
    pub latitude: u16,
    pub longitude: u16,
    pub extent_of_latitude: u16,
    pub extent_of_longitude: u16,
    pub subcells: Vec<Subcell>,
}

/// Cell list descriptor (tag `0x6C`), carried in the NIT.
#[derive(Clone, Debug)]
pub struct CellList {
    pub cells: Vec<Cell>,
}

impl CellList {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        let mut cells = Vec::new();
        let mut offset = 0usize;

        // 10 fixed bytes per cell, then the declared subcell loop.
        while body.len() - offset >= 10 {
            let extents = [body[offset + 6], body[offset + 7], body[offset + 8]];
            let subcell_len = body[offset + 9] as usize;
            let subcell_end = offset + 10 + subcell_len;
            if subcell_end > body.len() {
                break;
            }

            let mut subcells = Vec::new();
            let mut sub = offset + 10;
            while subcell_end - sub >= 8 {
                let ext = [body[sub + 5], body[sub + 6], body[sub + 7]];
                subcells.push(Subcell {
                    cell_id_extension: body[sub],
                    latitude: u16::from_be_bytes([body[sub + 1], body[sub + 2]]),
                    longitude: u16::from_be_bytes([body[sub + 3], body[sub + 4]]),
                    extent_of_latitude: extent_high(ext),
                    extent_of_longitude: extent_low(ext),
                });
                sub += 8;
            }

            cells.push(Cell {
                cell_id: u16::from_be_bytes([body[offset], body[offset + 1]]),
                latitude: u16::from_be_bytes([body[offset + 2], body[offset + 3]]),
                longitude: u16::from_be_bytes([body[offset + 4], body[offset + 5]]),
                extent_of_latitude: extent_high(extents),
                extent_of_longitude: extent_low(extents),
                subcells,
            });
            offset = subcell_end;
        }

        Some(Self { cells })
    }
}

/// Upper 12 bits of a packed pair of 12-bit extents.
fn extent_high(raw: [u8; 3]) -> u16 {
    ((raw[0] as u16) << 4) | (raw[1] >> 4) as u16
}

/// Lower 12 bits of a packed pair of 12-bit extents.
fn extent_low(raw: [u8; 3]) -> u16 {
    ((raw[1] as u16 & 0x0F) << 8) | raw[2] as u16
}

/// Frequency assignment for one cell in a cell frequency link descriptor.
#[derive(Clone, Debug)]
pub struct FrequencyLink {
    pub cell_id: u16,
    /// Centre frequency in units of 10 Hz.
    pub frequency: u32,
    /// Transposer frequencies of the subcells, by cell id extension.
    pub subcells: Vec<(u8, u32)>,
}

/// Cell frequency link descriptor (tag `0x6D`).
#[derive(Clone, Debug)]
pub struct CellFrequencyLink {
    pub links: Vec<FrequencyLink>,
}

impl CellFrequencyLink {
    pub(crate) fn decode(body: &Bytes) -> Option<Self> {
        let mut links = Vec::new();
        let mut offset = 0usize;

        while body.len() - offset >= 7 {
            let subcell_len = body[offset + 6] as usize;
            let subcell_end = offset + 7 + subcell_len;
            if subcell_end > body.len() {
                break;
            }

            let mut subcells = Vec::new();
            let mut sub = offset + 7;
            while subcell_end - sub >= 5 {
                subcells.push((
                    body[sub],
                    u32::from_be_bytes([
                        body[sub + 1],
                        body[sub + 2],
                        body[sub + 3],
                        body[sub + 4],
                    ]),
                ));
                sub += 5;
            }

            links.push(FrequencyLink {
                cell_id: u16::from_be_bytes([body[offset], body[offset + 1]]),
                frequency: u32::from_be_bytes([
                    body[offset + 2],
                    body[offset + 3],
                    body[offset + 4],
                    body[offset + 5],
                ]),
                subcells,
            });
            offset = subcell_end;
        }

        Some(Self { links })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cable_frequency_and_symbol_rate() {
        // 346.0000 MHz, QAM-64, 6900 ksym/s, FEC 3/4.
        let body = Bytes::from_static(&[
            0x03, 0x46, 0x00, 0x00, 0xFF, 0xF2, 0x03, 0x00, 0x69, 0x00, 0x03,
        ]);
        let cable = CableDelivery::decode(&body).unwrap();
        assert_eq!(cable.frequency, 346_000_000);
        assert_eq!(cable.symbol_rate, 6_900_000);
        assert_eq!(cable.modulation, 0x03);
        assert_eq!(cable.fec_outer, 0x02);
        assert_eq!(cable.fec_inner, 0x03);
    }

    #[test]
    fn satellite_position_and_polarization() {
        // 11.836 GHz, 19.2 degrees east, horizontal, 27500 ksym/s.
        let body = Bytes::from_static(&[
            0x01, 0x18, 0x36, 0x00, 0x01, 0x92, 0x80, 0x02, 0x75, 0x00, 0x05,
        ]);
        let sat = SatelliteDelivery::decode(&body).unwrap();
        assert_eq!(sat.frequency, 11_836_000);
        assert_eq!(sat.orbital_position, 192);
        assert!(sat.west_east);
        assert_eq!(sat.polarization, 0);
        assert_eq!(sat.symbol_rate, 27_500_000);
    }

    #[test]
    fn terrestrial_frequency_is_binary() {
        let body = Bytes::from_static(&[
            0x02, 0xFA, 0xF0, 0x80, 0x20, 0x9F, 0x61, 0xFF, 0xFF, 0xFF, 0xFF,
        ]);
        let terr = TerrestrialDelivery::decode(&body).unwrap();
        assert_eq!(terr.frequency, 500_000_000);
        assert_eq!(terr.bandwidth, 1);
        assert_eq!(terr.constellation, 2);
        assert!(terr.other_frequency_in_use);
    }

    #[test]
    fn frequency_list_entries() {
        let body = Bytes::from_static(&[0x03, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00]);
        let list = FrequencyList::decode(&body).unwrap();
        assert_eq!(list.coding_type, 3);
        assert_eq!(list.frequencies, vec![0x100, 0x200]);
    }

    #[test]
    fn cell_list_with_subcell() {
        let mut body = vec![
            0x00, 0x01, // cell id
            0x10, 0x00, 0x20, 0x00, // lat / lon
            0x12, 0x34, 0x56, // extents 0x123 / 0x456
        ];
        body.push(8); // one subcell
        body.extend_from_slice(&[0x07, 0x11, 0x00, 0x22, 0x00, 0xAB, 0xCD, 0xEF]);

        let list = CellList::decode(&Bytes::from(body)).unwrap();
        assert_eq!(list.cells.len(), 1);
        let cell = &list.cells[0];
        assert_eq!(cell.cell_id, 1);
        assert_eq!(cell.extent_of_latitude, 0x123);
        assert_eq!(cell.extent_of_longitude, 0x456);
        assert_eq!(cell.subcells.len(), 1);
        assert_eq!(cell.subcells[0].cell_id_extension, 0x07);
        assert_eq!(cell.subcells[0].extent_of_latitude, 0xABC);
    }

    #[test]
    fn cell_frequency_link_entries() {
        let body = Bytes::from_static(&[
            0x00, 0x01, 0x02, 0xFA, 0xF0, 0x80, 0x05, // cell 1 + one subcell
            0x03, 0x02, 0xFA, 0xF0, 0x90,
        ]);
        let link = CellFrequencyLink::decode(&body).unwrap();
        assert_eq!(link.links.len(), 1);
        assert_eq!(link.links[0].cell_id, 1);
        assert_eq!(link.links[0].subcells, vec![(0x03, 0x02FAF090)]);
    }
}
