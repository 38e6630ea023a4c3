//! Per-device orchestration of S1-S9: pick the device's best capture day,
//! split it into sessions, and mine+extract a signature for each one.

use anyhow::{Context, Result};
use fingerprint_capture::{device_table::DeviceTable, pcap_source::PcapFileSource};
use fingerprint_core::config::PipelineConfig;
use fingerprint_core::source::collect_all;
use fingerprint_core::{cluster, filter, keypacket, periodicity, session, signature, Session, StageReport};
use std::fs;
use std::path::Path;

pub struct DeviceResult {
    pub device: String,
    pub signatures: Vec<signature::Signature>,
    pub report: StageReport,
    /// One line per candidate/selected period decision, in the reference
    /// implementation's literal labels (§8 "record.txt").
    pub record_lines: Vec<String>,
}

fn decode_day(day_dir: &Path, device: &str, device_table: &DeviceTable) -> Result<Vec<fingerprint_core::Packet>> {
    let mut packets = Vec::new();
    let mut entries: Vec<_> = fs::read_dir(day_dir)
        .with_context(|| format!("reading {}", day_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "pcap").unwrap_or(false))
        .collect();
    entries.sort();

    for pcap_path in entries {
        let source = PcapFileSource::open(&pcap_path, device, device_table.clone())
            .with_context(|| format!("opening {}", pcap_path.display()))?;
        packets.extend(collect_all(source));
    }
    packets.sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap());
    Ok(packets)
}

/// Runs S1-S9 for one device directory (`<input>/<device>/<day>/*.pcap`),
/// using the day with the most surviving sessions (S2).
pub fn process_device(device_dir: &Path, device: &str, device_table: &DeviceTable, config: &PipelineConfig) -> Result<DeviceResult> {
    let mut report = StageReport::default();
    let mut record_lines = Vec::new();

    let mut day_dirs: Vec<_> = fs::read_dir(device_dir)
        .with_context(|| format!("reading {}", device_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    day_dirs.sort();

    let mut sessions_by_day: Vec<(String, Vec<Session>)> = Vec::new();
    for day_dir in &day_dirs {
        let day_name = day_dir.file_name().unwrap().to_string_lossy().to_string();
        match decode_day(day_dir, device, device_table) {
            Ok(packets) => {
                let sessions = session::split_sessions(&packets, config.duration_fraction);
                sessions_by_day.push((day_name, sessions));
            }
            Err(e) => {
                log::warn!("device {device}, day {day_name}: {e}");
                report.record_fail();
            }
        }
    }

    let counts: Vec<(String, usize)> = sessions_by_day.iter().map(|(d, s)| (d.clone(), s.len())).collect();
    let best_day = session::select_best_day(&counts).map(|s| s.to_string());

    let Some(best_day) = best_day else {
        return Ok(DeviceResult { device: device.to_string(), signatures: Vec::new(), report, record_lines });
    };

    let sessions = sessions_by_day.into_iter().find(|(d, _)| *d == best_day).map(|(_, s)| s).unwrap_or_default();

    let mut signatures = Vec::new();
    for sess in &sessions {
        let session_name = sess.flow_key.file_stem();
        let result = periodicity::analyze(sess);

        record_lines.push(format!(
            "{session_name}: 候选周期: {:?}",
            result.candidates.iter().collect::<Vec<_>>()
        ));

        let Some((period, score)) = result.best else {
            record_lines.push(format!("{session_name}: 无法选出周期，跳过"));
            report.record_fail();
            continue;
        };
        record_lines.push(format!("{session_name}: 选择周期: {period} (r={:.3}, r_n={:.3})", score.r, score.r_n));

        let samples = periodicity::slice_by_period(sess, period);
        if !session::has_sufficient_samples(samples.len(), config.min_samples_per_session) {
            report.record_fail();
            continue;
        }

        let mut filtered_packets = Vec::new();
        let mut sample_indices = Vec::new();
        for (idx, sample) in samples.iter().enumerate() {
            if let Some(kept) = filter::filter_sample(sample) {
                sample_indices.extend(std::iter::repeat(idx).take(kept.len()));
                filtered_packets.extend(kept);
            }
        }

        let rows = cluster::cluster_session(&filtered_packets, &sample_indices, samples.len(), config.dbscan_eps, config.dbscan_min_samples);
        let key_packets = keypacket::mine_key_packets(&rows, samples.len());

        match signature::extract_signature(device, &session_name, period, &samples, &key_packets, config.zero_run_strip_len) {
            Some(sig) => {
                signatures.push(sig);
                report.record_ok();
            }
            None => {
                report.record_fail();
            }
        }
    }

    Ok(DeviceResult { device: device.to_string(), signatures, report, record_lines })
}
