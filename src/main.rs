use anyhow::Result;
use clap::Parser;
use gquicrab::{logging, parser};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing::trace;

/// Passive GQUIC flow analyzer for pcapng captures.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Capture file to analyze
    capture: PathBuf,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let _guard = logging::init_logging(level, args.log_file.as_deref())?;

    let mut state = parser::parse_pcap(&args.capture, |progress| {
        trace!(progress, "Parser progress update");
    })?;
    let records = state.terminate_flows();

    println!(
        "flow\tproto\tgquicStat\tgquicPubFlags\tgquicFrameTypes\tgquicCID\tgquicSNI\tgquicUAID"
    );
    for (key, record) in &records {
        println!(
            "{}\t{}\t0x{:02x}\t0x{:02x}\t0x{:04x}\t{}\t{}\t{}",
            key,
            key.protocol,
            record.status,
            record.pub_flags,
            record.frame_types,
            record.conn_id,
            record.sni,
            record.uaid
        );
    }

    state.summary.log_report(state.packet_count);
    Ok(())
}
