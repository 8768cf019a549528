use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser as ClapParser;
use serde::Serialize;

use dvbsi_decoder::parser::SectionParser;
use dvbsi_decoder::tables::Table;

#[derive(ClapParser)]
#[command(about = "Decode DVB SI/PSI tables from a capture file")]
struct Opt {
    /// Transport stream or raw section dump to decode
    input: PathBuf,

    /// Keep sections whose CRC fails instead of dropping them
    #[clap(long, default_value_t = false)]
    ignore_crc: bool,

    /// Print one line per decoded table instead of the JSON summary
    #[clap(long, default_value_t = false)]
    dump: bool,
}

#[derive(Default, Serialize)]
struct Report {
    generated_at: String,
    sections: usize,
    crc_errors: u64,
    tables: BTreeMap<&'static str, usize>,
    services: Vec<ServiceReport>,
    programs: Vec<ProgramReport>,
    events: usize,
    clock: Option<String>,
}

#[derive(Serialize)]
struct ServiceReport {
    service_id: u16,
    provider: String,
    name: String,
}

#[derive(Serialize)]
struct ProgramReport {
    program: u16,
    pmt_pid: u16,
    streams: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::parse();

    let data = std::fs::read(&opt.input)
        .with_context(|| format!("reading {}", opt.input.display()))?;

    let mut tables = Vec::new();
    let crc_errors = if looks_like_transport_stream(&data) {
        collect_from_transport_stream(&data, opt.ignore_crc, &mut tables)
    } else {
        collect_from_sections(&data, opt.ignore_crc, &mut tables)
    };

    if opt.dump {
        for table in &tables {
            println!("{table:?}");
        }
        return Ok(());
    }

    let report = build_report(&tables, crc_errors);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn looks_like_transport_stream(data: &[u8]) -> bool {
    data.len() >= 188 && data.len() % 188 == 0 && data[0] == 0x47
}

/// Decodes a raw concatenation of sections.
fn collect_from_sections(data: &[u8], ignore_crc: bool, tables: &mut Vec<Table>) -> u64 {
    let mut parser = SectionParser::new();
    parser.ignore_crc_errors = ignore_crc;

    if parser.add(data).is_err() {
        log::warn!("input larger than the section buffer, decoding what fits");
    }
    while let Some(section) = parser.read_section() {
        if let Some(table) = section.into_table() {
            tables.push(table);
        }
    }
    parser.crc_errors
}

/// Walks 188-byte transport packets, routing the payload of every PID
/// known to carry sections into its own framer. PMT PIDs are learned
/// from the PAT as it decodes.
fn collect_from_transport_stream(
    data: &[u8],
    ignore_crc: bool,
    tables: &mut Vec<Table>,
) -> u64 {
    // PAT, NIT, SDT, EIT, TDT/TOT.
    let mut section_pids: HashSet<u16> = [0x0000, 0x0010, 0x0011, 0x0012, 0x0014]
        .into_iter()
        .collect();
    let mut parsers: HashMap<u16, SectionParser> = HashMap::new();

    for chunk in data.chunks_exact(188) {
        if chunk[0] != 0x47 {
            continue; // bad sync
        }
        let pid = ((chunk[1] & 0x1F) as u16) << 8 | chunk[2] as u16;
        if !section_pids.contains(&pid) {
            continue;
        }
        let payload_unit_start = chunk[1] & 0x40 != 0;
        let adaptation_field_ctrl = (chunk[3] & 0x30) >> 4;

        let mut payload_offset = 4usize;
        if adaptation_field_ctrl == 2 || adaptation_field_ctrl == 0 {
            continue; // no payload
        }
        if adaptation_field_ctrl == 3 {
            payload_offset += 1 + chunk[4] as usize;
            if payload_offset >= 188 {
                continue;
            }
        }
        let payload = &chunk[payload_offset..];

        let parser = parsers.entry(pid).or_insert_with(|| {
            let mut parser = SectionParser::new();
            parser.ignore_crc_errors = ignore_crc;
            parser
        });

        // With payload_unit_start set the first byte points at the next
        // section boundary; everything before it still belongs to the
        // section in progress.
        // An overrun resets the framer on its own; keep going.
        if payload_unit_start {
            let pointer = payload[0] as usize;
            if 1 + pointer > payload.len() {
                continue;
            }
            let _ = parser.add(&payload[1..1 + pointer]);
            let _ = parser.add(&payload[1 + pointer..]);
        } else {
            let _ = parser.add(payload);
        }

        drain(parser, &mut section_pids, tables);
    }

    parsers.values().map(|parser| parser.crc_errors).sum()
}

fn drain(parser: &mut SectionParser, section_pids: &mut HashSet<u16>, tables: &mut Vec<Table>) {
    while let Some(section) = parser.read_section() {
        let Some(table) = section.into_table() else {
            continue;
        };
        if let Table::Pat(pat) = &table {
            for (_, pid) in &pat.programs {
                section_pids.insert(*pid);
            }
        }
        tables.push(table);
    }
}

fn build_report(tables: &[Table], crc_errors: u64) -> Report {
    let mut report = Report {
        generated_at: chrono::Utc::now().to_rfc3339(),
        sections: tables.len(),
        crc_errors,
        ..Report::default()
    };
    let mut seen_services = HashSet::new();
    let mut seen_programs = HashSet::new();
    let mut pmt_pids: HashMap<u16, u16> = HashMap::new();

    for table in tables {
        *report.tables.entry(table.name()).or_default() += 1;

        match table {
            Table::Pat(pat) => {
                for (program, pid) in &pat.programs {
                    pmt_pids.insert(*program, *pid);
                }
            }
            Table::Pmt(pmt) => {
                if seen_programs.insert(pmt.program_number) {
                    report.programs.push(ProgramReport {
                        program: pmt.program_number,
                        pmt_pid: pmt_pids.get(&pmt.program_number).copied().unwrap_or(0),
                        streams: pmt.streams.len(),
                    });
                }
            }
            Table::Sdt(sdt) => {
                for entry in &sdt.services {
                    if !seen_services.insert(entry.service_id) {
                        continue;
                    }
                    let (provider, name) = entry
                        .service()
                        .map(|s| (s.provider_name.clone(), s.service_name.clone()))
                        .unwrap_or_default();
                    report.services.push(ServiceReport {
                        service_id: entry.service_id,
                        provider,
                        name,
                    });
                }
            }
            Table::Eit(eit) => report.events += eit.events.len(),
            Table::Tdt(tdt) => report.clock = Some(tdt.time.to_rfc3339()),
            Table::Tot(tot) => report.clock = Some(tot.time.to_rfc3339()),
            Table::Nit(_) | Table::Cit(_) => {}
        }
    }

    report.services.sort_by_key(|service| service.service_id);
    report.programs.sort_by_key(|program| program.program);
    report
}
