//! `fp-mine`: builds a device signature bank from per-device pcap captures
//! laid out as `<input>/<device>/<day>/*.pcap`.

mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use fingerprint_capture::device_table::DeviceTable;
use fingerprint_core::config::{load_config, PipelineConfig};
use fingerprint_core::merge::merge_signature;
use prettytable::{row, Table};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(about = "Mines device signatures from per-device packet captures")]
struct Args {
    /// Root directory laid out as `<input>/<device>/<day>/*.pcap`.
    #[clap(short, long, parse(from_os_str), value_name = "DIR")]
    input: PathBuf,

    /// Device name -> MAC address TOML table.
    #[clap(short, long, parse(from_os_str), value_name = "FILE")]
    device_table: PathBuf,

    /// Pipeline configuration TOML file; defaults are used if omitted.
    #[clap(short, long, parse(from_os_str), value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory to write the signature bank and per-device reports into.
    #[clap(short, long, parse(from_os_str), value_name = "DIR", default_value = "out")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config: PipelineConfig = match &args.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    let device_table = DeviceTable::load(&args.device_table).context("loading device table")?;

    fs::create_dir_all(&args.out)?;

    let mut device_dirs: Vec<PathBuf> = fs::read_dir(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    device_dirs.sort();

    let worker_count = config.resolved_worker_count();
    let jobs: Vec<(PathBuf, String)> = device_dirs
        .iter()
        .map(|d| (d.clone(), d.file_name().unwrap().to_string_lossy().to_string()))
        .collect();

    let device_table_for_workers = device_table.clone();
    let config_for_workers = config.clone();
    let results = fingerprint_core::workers::run_pool(jobs, worker_count, move |(dir, name)| {
        pipeline::process_device(&dir, &name, &device_table_for_workers, &config_for_workers)
    });

    let mut summary = Table::new();
    summary.add_row(row!["device", "sessions total", "signatures", "failed"]);

    let signature_csv_path = args.out.join("signatures.csv");
    let mut writer = csv::Writer::from_path(&signature_csv_path).context("creating signature CSV")?;

    for result in results {
        let device_result = match result {
            Ok(r) => r,
            Err(e) => {
                log::error!("device processing failed: {e}");
                continue;
            }
        };

        summary.add_row(row![
            device_result.device,
            device_result.report.total,
            device_result.report.ok,
            device_result.report.fail
        ]);

        for sig in &device_result.signatures {
            writer.serialize(merge_signature(sig))?;
        }

        let record_path = args.out.join(format!("{}_record.txt", device_result.device));
        fs::write(&record_path, device_result.record_lines.join("\n"))?;
    }

    writer.flush()?;
    summary.printstd();
    Ok(())
}
