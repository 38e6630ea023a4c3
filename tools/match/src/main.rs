//! `fp-match`: streams a test pcap capture against a signature bank and
//! reports which candidate devices it matches (§4.8).

use anyhow::{Context, Result};
use clap::Parser;
use fingerprint_capture::device_table::DeviceTable;
use fingerprint_capture::pcap_source::PcapFileSource;
use fingerprint_core::matcher::{DeviceMatcher, MatchKey};
use fingerprint_core::merge::{unmerge_signature, MergedSignatureRow};
use fingerprint_core::signature::Signature;
use fingerprint_core::source::PacketSource;
use prettytable::{row, Table};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(about = "Matches a test capture against a device signature bank")]
struct Args {
    /// Merged signature bank CSV, as written by `fp-mine`.
    #[clap(short, long, parse(from_os_str), value_name = "FILE")]
    signatures: PathBuf,

    /// Test pcap capture to stream against the bank.
    #[clap(short, long, parse(from_os_str), value_name = "FILE")]
    test: PathBuf,

    /// Device name -> MAC address TOML table, used to resolve the observed
    /// device's own MAC (direction is always relative to it).
    #[clap(short, long, parse(from_os_str), value_name = "FILE")]
    device_table: PathBuf,

    /// Name of the physical device under test, as it appears in
    /// `device_table` (its signatures need not be in the bank).
    #[clap(short = 'n', long)]
    observed_device: String,
}

fn load_signatures(path: &PathBuf) -> Result<Vec<Signature>> {
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut signatures = Vec::new();
    for row in reader.deserialize() {
        let row: MergedSignatureRow = row?;
        signatures.push(unmerge_signature(&row)?);
    }
    Ok(signatures)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let device_table = DeviceTable::load(&args.device_table).context("loading device table")?;
    let signatures = load_signatures(&args.signatures)?;

    let mut devices: Vec<String> = signatures.iter().map(|s| s.device.clone()).collect();
    devices.sort();
    devices.dedup();

    let mut matchers: HashMap<String, DeviceMatcher> =
        devices.iter().map(|d| (d.clone(), DeviceMatcher::new(d, &signatures))).collect();

    let mut source = PcapFileSource::open(&args.test, &args.observed_device, device_table)
        .with_context(|| format!("opening {}", args.test.display()))?;

    let mut packet_count = 0usize;
    while let Some(pkt) = source.next_packet()? {
        let key = MatchKey::from_packet(&pkt);
        for matcher in matchers.values_mut() {
            matcher.feed(&key);
        }
        packet_count += 1;
    }

    let mut table = Table::new();
    table.add_row(row!["device", "matched"]);
    for device in &devices {
        let matched = matchers.get(device).map(|m| m.is_fully_matched()).unwrap_or(false);
        table.add_row(row![device, if matched { "yes" } else { "no" }]);
    }
    table.printstd();
    log::info!("streamed {packet_count} test packets");

    Ok(())
}
