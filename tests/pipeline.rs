//! End-to-end checks: wire bytes through framing, table decoding and the
//! blocking reader.

use std::sync::Arc;
use std::time::Duration;

use dvbsi_decoder::dispatch::{NullFilter, StreamDispatcher, StreamKind};
use dvbsi_decoder::parser::SectionParser;
use dvbsi_decoder::section::encode_section;
use dvbsi_decoder::tables::{Sdt, Table};
use dvbsi_decoder::TableReader;

fn decode_all(wire: &[u8]) -> Vec<Table> {
    let mut parser = SectionParser::new();
    parser.add(wire).unwrap();

    let mut tables = Vec::new();
    while let Some(section) = parser.read_section() {
        if let Some(table) = section.into_table() {
            tables.push(table);
        }
    }
    tables
}

#[test]
fn pat_section_maps_programs_to_pids() {
    // 0x00 0xB0 0x0D: one program entry plus the CRC.
    let wire = encode_section(
        0x00,
        true,
        &[0x00, 0x07, 0xC1, 0x00, 0x00, 0x00, 0x01, 0xE0, 0x64],
    );
    assert_eq!(&wire[..3], &[0x00, 0xB0, 0x0D]);

    let tables = decode_all(&wire);
    let Table::Pat(pat) = &tables[0] else {
        panic!("expected a PAT");
    };
    assert_eq!(pat.transport_stream_id, 7);
    assert_eq!(pat.pid_of(1), Some(0x64));
}

#[test]
fn mixed_tables_in_one_stream() {
    let mut wire = Vec::new();
    wire.extend(encode_section(
        0x00,
        true,
        &[0x00, 0x07, 0xC1, 0x00, 0x00, 0x00, 0x01, 0xE0, 0x64],
    ));
    wire.extend(encode_section(
        0x02,
        true,
        &[
            0x00, 0x01, 0xC1, 0x00, 0x00, 0xE0, 0x65, 0xF0, 0x00, //
            0x02, 0xE0, 0x65, 0xF0, 0x00, //
            0x03, 0xE0, 0x66, 0xF0, 0x00,
        ],
    ));
    wire.extend(encode_section(
        0x42,
        true,
        &[
            0x00, 0x07, 0xC1, 0x00, 0x00, 0x00, 0x55, 0xFF, //
            0x00, 0x01, 0xFC, 0x80, 0x0D, //
            0x48, 0x0B, 0x01, 0x04, b'P', b'r', b'o', b'v', 0x04, b'M', b'a', b'i', b'n',
        ],
    ));
    wire.extend(encode_section(0x70, false, &[0xC0, 0x79, 0x12, 0x45, 0x00]));

    // Delivered in awkward chunk sizes to exercise reframing.
    let mut parser = SectionParser::new();
    let mut tables = Vec::new();
    for chunk in wire.chunks(7) {
        parser.add(chunk).unwrap();
        while let Some(section) = parser.read_section() {
            tables.extend(section.into_table());
        }
    }

    let names: Vec<&str> = tables.iter().map(Table::name).collect();
    assert_eq!(names, vec!["PAT", "PMT", "SDT", "TDT"]);

    let Table::Pmt(pmt) = &tables[1] else { panic!() };
    assert_eq!(pmt.streams.len(), 2);

    let Table::Sdt(sdt) = &tables[2] else { panic!() };
    let service = sdt.services[0].service().unwrap();
    assert_eq!(service.provider_name, "Prov");
    assert_eq!(service.service_name, "Main");
}

#[test]
fn corrupted_section_does_not_break_the_stream() {
    let mut wire = encode_section(0x00, true, &[0x00, 0x07, 0xC1, 0x00, 0x00]);
    let crc_at = wire.len() - 1;
    wire[crc_at] ^= 0x01;
    wire.extend(encode_section(
        0x00,
        true,
        &[0x00, 0x08, 0xC1, 0x00, 0x00, 0x00, 0x01, 0xE0, 0x64],
    ));

    let mut parser = SectionParser::new();
    parser.add(&wire).unwrap();

    let mut tables = Vec::new();
    while let Some(section) = parser.read_section() {
        tables.extend(section.into_table());
    }

    assert_eq!(parser.crc_errors, 1);
    assert_eq!(tables.len(), 1);
    let Table::Pat(pat) = &tables[0] else { panic!() };
    assert_eq!(pat.transport_stream_id, 8);
}

fn sdt_wire(version: u8, section: u8, last: u8) -> Vec<u8> {
    let body = [
        0x00,
        0x07,
        0xC1 | (version << 1),
        section,
        last,
        0x00,
        0x55,
        0xFF,
    ];
    encode_section(0x42, true, &body)
}

#[test]
fn reader_completes_after_a_version_change() {
    let dispatcher = Arc::new(StreamDispatcher::new(Box::new(NullFilter)));
    let reader = TableReader::<Sdt>::start(&dispatcher).unwrap();

    let feeder = {
        let dispatcher = Arc::clone(&dispatcher);
        std::thread::spawn(move || {
            // Version 1 never completes, version 2 does.
            dispatcher.dispatch(0x11, &sdt_wire(1, 0, 1));
            dispatcher.dispatch(0x11, &sdt_wire(2, 1, 1));
            dispatcher.dispatch(0x11, &sdt_wire(2, 0, 1));
        })
    };

    let tables = reader.wait_for_tables(Duration::from_secs(5)).unwrap();
    assert_eq!(tables.len(), 2);
    assert!(tables.iter().all(|table| table.header.version == 2));
    assert_eq!(tables[0].header.section_number, 0);
    feeder.join().unwrap();
}

#[test]
fn concurrent_readers_share_one_pid() {
    let dispatcher = Arc::new(StreamDispatcher::new(Box::new(NullFilter)));
    let first = TableReader::<Sdt>::start(&dispatcher).unwrap();
    let second = TableReader::<Sdt>::start(&dispatcher).unwrap();
    assert_eq!(dispatcher.active_consumer_count(0x11), 2);

    dispatcher.dispatch(0x11, &sdt_wire(1, 0, 0));

    assert!(first.wait_for_tables(Duration::from_secs(1)).is_some());
    assert!(second.wait_for_tables(Duration::from_secs(1)).is_some());
}

#[test]
fn sections_survive_extra_consumer_traffic() {
    let dispatcher = Arc::new(StreamDispatcher::new(Box::new(NullFilter)));
    let reader = TableReader::<Sdt>::start(&dispatcher).unwrap();

    // An unrelated consumer on another PID must never see SDT bytes.
    let other = dispatcher.add_consumer(
        0x100,
        StreamKind::Payload,
        Box::new(|_| panic!("wrong PID")),
    );
    dispatcher.set_consumer_state(other, true).unwrap();

    dispatcher.dispatch(0x11, &sdt_wire(1, 0, 0));
    assert!(reader.wait_for_tables(Duration::from_secs(1)).is_some());
}
