use super::decoder::decode_headers;
use super::{packets, state};
use anyhow::{Context, Result};
use pcap_parser::pcapng::EnhancedPacketBlock;
use pcap_parser::traits::{PcapNGPacketBlock, PcapReaderIterator};
use pcap_parser::*;
use std::fs::File;
use std::time::Instant;
use tracing::{debug, error, info, warn};

struct InterfaceDescription {
    linktype: Linktype,
    ts_resolution: u8,
    ts_offset: i64,
}

pub fn parse_pcap<F>(file_path: &std::path::Path, on_progress: F) -> Result<state::ParseState>
where
    F: Fn(f32),
{
    let file = File::open(file_path).context("Failed to open file")?;
    let file_size = file.metadata()?.len();
    info!(path = ?file_path, size_bytes = file_size, "Starting PCAP parse");
    let mut reader = PcapNGReader::new(65536, file)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to create reader")?;
    let mut state = state::ParseState::default();
    let mut interfaces: Vec<InterfaceDescription> = Vec::new();
    let mut bytes_read = 0;
    let mut last_progress_update = 0;
    let start_time = Instant::now();

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                bytes_read += offset;
                if bytes_read - last_progress_update > 1_000 {
                    on_progress(bytes_read as f32 / file_size as f32);
                    last_progress_update = bytes_read;
                }
                match block {
                    PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                        debug!("Encountered SectionHeader; clearing interface descriptions");
                        interfaces.clear();
                    }
                    PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                        interfaces.push(InterfaceDescription {
                            linktype: idb.linktype,
                            ts_resolution: idb.if_tsresol,
                            ts_offset: idb.if_tsoffset,
                        });
                        debug!(
                            if_id = interfaces.len() - 1,
                            "Registered interface description"
                        );
                    }
                    PcapBlockOwned::NG(Block::EnhancedPacket(ref epb)) => {
                        let if_id = epb.if_id as usize;
                        if if_id >= interfaces.len() {
                            warn!(
                                if_id = if_id,
                                "EPB references unknown interface; skipping packet"
                            );
                        } else {
                            let interface = &interfaces[if_id];
                            if interface.linktype == pcap_parser::Linktype::ETHERNET {
                                handle_enhanced_packet(epb, interface, &mut state);
                            }
                        }
                    }
                    PcapBlockOwned::NG(_) => {
                        debug!("Skipping unsupported pcapng block");
                    }
                    PcapBlockOwned::Legacy(_) | PcapBlockOwned::LegacyHeader(_) => {
                        debug!("Unsupported block type: Legacy")
                    }
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader.refill().expect("Failed to refill reader");
            }
            Err(e) => error!(error = ?e, "Error while reading packet data"),
        }
    }
    let elapsed = start_time.elapsed();
    info!(
        path = ?file_path,
        packets = state.packet_count,
        flows = state.flows.len(),
        elapsed_ms = elapsed.as_millis(),
        "Completed PCAP parse"
    );
    Ok(state)
}

fn calculate_ts_unit(resolution: u8) -> u64 {
    if resolution & 0x80 != 0 {
        2u64.pow((resolution & 0x7F) as u32)
    } else {
        10u64.pow(resolution as u32)
    }
}

fn parse_timestamp(epb: &EnhancedPacketBlock, interface: &InterfaceDescription) -> f64 {
    let unit = calculate_ts_unit(interface.ts_resolution);
    epb.decode_ts_f64(interface.ts_offset as u64, unit)
}

fn handle_enhanced_packet(
    epb: &EnhancedPacketBlock,
    interface: &InterfaceDescription,
    state: &mut state::ParseState,
) {
    let timestamp = parse_timestamp(epb, interface);
    state::update_first_timestamp(&mut state.first_packet_ts, timestamp);

    let epb_packet_data = epb.packet_data();
    if let Ok(context) = decode_headers(epb_packet_data) {
        packets::add_packet(&context, timestamp, epb_packet_data.len() as u64, state);
    }
}
