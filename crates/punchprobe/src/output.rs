use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use punchprobe_frame::{DecodedStream, Punch};
use punchprobe_probe::{LevelFailure, LevelReport, ProbeConfig, ProbeReport};
use punchprobe_transport::{SimConfig, SimStats};
use serde::Serialize;

use crate::exit::level_failure_code;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct FailureOutput {
    pub kind: &'static str,
    pub message: String,
    pub exit_code: i32,
}

impl FailureOutput {
    fn from_failure(failure: &LevelFailure) -> Self {
        let kind = match failure {
            LevelFailure::EmptyReception => "empty-reception",
            LevelFailure::Framing(_) => "framing",
            LevelFailure::Verification(_) => "verification",
        };
        Self {
            kind,
            message: failure.to_string(),
            exit_code: level_failure_code(failure),
        }
    }
}

#[derive(Serialize)]
pub struct LevelOutput {
    pub index: usize,
    pub punches_sent: usize,
    pub bytes_sent: usize,
    pub bytes_received: usize,
    pub punches_decoded: usize,
    pub passed: bool,
    pub failure: Option<FailureOutput>,
}

impl From<&LevelReport> for LevelOutput {
    fn from(level: &LevelReport) -> Self {
        Self {
            index: level.index,
            punches_sent: level.punches_sent,
            bytes_sent: level.bytes_sent,
            bytes_received: level.bytes_received,
            punches_decoded: level.punches_decoded,
            passed: level.passed(),
            failure: level.failure().map(FailureOutput::from_failure),
        }
    }
}

/// Simulated device parameters and counters after a run.
#[derive(Serialize)]
pub struct DeviceOutput {
    pub channels: usize,
    pub capacity: usize,
    pub burst_bytes: usize,
    pub bytes_accepted: usize,
    pub writes_dropped: usize,
    pub bytes_dropped: usize,
    pub bytes_relayed: usize,
    pub gate_pulses: usize,
}

impl DeviceOutput {
    pub fn new(config: SimConfig, stats: SimStats) -> Self {
        Self {
            channels: config.channels,
            capacity: config.capacity,
            burst_bytes: config.burst_bytes,
            bytes_accepted: stats.bytes_accepted,
            writes_dropped: stats.writes_dropped,
            bytes_dropped: stats.bytes_dropped,
            bytes_relayed: stats.bytes_relayed,
            gate_pulses: stats.gate_pulses,
        }
    }
}

#[derive(Serialize)]
pub struct ProbeOutput {
    pub policy: &'static str,
    pub stations: u16,
    pub planned_levels: usize,
    pub flushed_bytes: usize,
    pub passed: bool,
    pub levels: Vec<LevelOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceOutput>,
}

impl ProbeOutput {
    pub fn new(report: &ProbeReport, config: &ProbeConfig) -> Self {
        Self {
            policy: config.policy.name(),
            stations: config.stations,
            planned_levels: report.planned_levels,
            flushed_bytes: report.flushed_bytes,
            passed: report.passed(),
            levels: report.levels.iter().map(LevelOutput::from).collect(),
            device: None,
        }
    }

    pub fn with_device(mut self, device: DeviceOutput) -> Self {
        self.device = Some(device);
        self
    }
}

pub fn print_probe(out: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "LEVEL", "PUNCHES", "SENT", "RECEIVED", "DECODED", "RESULT",
                ]);
            for level in &out.levels {
                table.add_row(vec![
                    level.index.to_string(),
                    level.punches_sent.to_string(),
                    level.bytes_sent.to_string(),
                    level.bytes_received.to_string(),
                    level.punches_decoded.to_string(),
                    result_cell(level),
                ]);
            }
            println!("{table}");
            print_summary(out);
        }
        OutputFormat::Pretty => {
            for level in &out.levels {
                println!(
                    "level {} ({} punches): {} bytes sent, {} bytes received, {} decoded: {}",
                    level.index,
                    level.punches_sent,
                    level.bytes_sent,
                    level.bytes_received,
                    level.punches_decoded,
                    result_cell(level)
                );
            }
            print_summary(out);
        }
    }
}

fn result_cell(level: &LevelOutput) -> String {
    match &level.failure {
        None => "PASS".to_string(),
        Some(failure) => format!("FAIL ({})", failure.message),
    }
}

fn print_summary(out: &ProbeOutput) {
    if let Some(device) = &out.device {
        println!(
            "device: {} writes dropped ({} bytes), {} bytes relayed in {} gate pulses",
            device.writes_dropped, device.bytes_dropped, device.bytes_relayed, device.gate_pulses
        );
    }
    let skipped = out.planned_levels - out.levels.len();
    let verdict = if out.passed { "PASS" } else { "FAIL" };
    if skipped > 0 {
        println!(
            "{verdict}: {} of {} levels run, {skipped} skipped",
            out.levels.len(),
            out.planned_levels
        );
    } else {
        println!("{verdict}: {} levels run", out.levels.len());
    }
}

/// One punch as listed by `generate` and `decode`.
#[derive(Serialize)]
pub struct PunchOutput {
    pub index: usize,
    /// Byte offset of the punch in the decoded stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    pub station: Option<u16>,
    pub serial: Option<u32>,
    pub store_index: Option<u32>,
    pub clock: Option<String>,
    pub sub_second: Option<u8>,
    pub checksum: Option<u16>,
    pub hex: String,
}

impl PunchOutput {
    pub fn new(index: usize, offset: Option<usize>, punch: &Punch) -> Self {
        let fields = punch.fields();
        Self {
            index,
            offset,
            station: punch.station(),
            serial: punch.serial(),
            store_index: punch.store_index(),
            clock: fields.map(|f| {
                let secs = f.time.seconds_since_midnight();
                format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
            }),
            sub_second: punch.sub_second(),
            checksum: punch.checksum(),
            hex: punch.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct GenerateOutput {
    pub stations: u16,
    pub count: usize,
    pub bytes: usize,
    pub punches: Vec<PunchOutput>,
}

#[derive(Serialize)]
pub struct DecodeOutput {
    pub bytes: usize,
    pub consumed: usize,
    pub punches: Vec<PunchOutput>,
    pub error: Option<String>,
    pub error_offset: Option<usize>,
}

impl DecodeOutput {
    pub fn new(bytes: usize, decoded: &DecodedStream) -> Self {
        let mut offset = 0;
        let punches = decoded
            .punches
            .iter()
            .enumerate()
            .map(|(index, punch)| {
                let out = PunchOutput::new(index, Some(offset), punch);
                offset += punch.wire_size();
                out
            })
            .collect();
        Self {
            bytes,
            consumed: decoded.consumed,
            punches,
            error: decoded.error.as_ref().map(ToString::to_string),
            error_offset: decoded.error.as_ref().map(|err| err.offset()),
        }
    }
}

pub fn print_generated(out: &GenerateOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_punch_table(&out.punches),
        OutputFormat::Pretty => {
            for punch in &out.punches {
                println!("{}", punch.hex);
            }
        }
    }
}

pub fn print_decoded(out: &DecodeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            if matches!(format, OutputFormat::Table) {
                print_punch_table(&out.punches);
            } else {
                for punch in &out.punches {
                    println!(
                        "@{} station={} serial={} {}",
                        punch.offset.unwrap_or_default(),
                        display_opt(punch.station),
                        display_opt(punch.serial),
                        punch.hex
                    );
                }
            }
            println!(
                "{} punches, {} of {} bytes consumed",
                out.punches.len(),
                out.consumed,
                out.bytes
            );
            if let Some(err) = &out.error {
                println!("framing error: {err}");
            }
        }
    }
}

fn print_punch_table(punches: &[PunchOutput]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "STATION", "SERIAL", "INDEX", "TIME", "HEX"]);
    for punch in punches {
        table.add_row(vec![
            punch.index.to_string(),
            display_opt(punch.station),
            display_opt(punch.serial),
            display_opt(punch.store_index),
            punch.clock.clone().unwrap_or_else(|| "-".to_string()),
            punch.hex.clone(),
        ]);
    }
    println!("{table}");
}

fn display_opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

#[cfg(test)]
mod tests {
    use punchprobe_frame::{decode_stream, PunchFields, PunchTime, PUNCH_LEN};

    use super::*;

    fn punch(serial: u32) -> Punch {
        Punch::encode(&PunchFields {
            station: 1,
            serial,
            store_index: serial,
            time: PunchTime {
                day_flags: 0x01,
                time_of_day: 3723,
                sub_second: 0,
            },
        })
    }

    #[test]
    fn punch_output_formats_clock_across_half_day() {
        let out = PunchOutput::new(0, None, &punch(9));
        // PM bit set: 12h + 1h 2m 3s.
        assert_eq!(out.clock.as_deref(), Some("13:02:03"));
        assert_eq!(out.serial, Some(9));
        assert_eq!(out.checksum, Some(0xABCD));
    }

    #[test]
    fn decode_output_tracks_offsets_and_error() {
        let mut stream = punch(0).as_bytes().to_vec();
        stream.extend_from_slice(punch(1).as_bytes());
        stream.extend_from_slice(&[0x02, 0x00]);
        let decoded = decode_stream(stream.clone());

        let out = DecodeOutput::new(stream.len(), &decoded);

        assert_eq!(out.punches.len(), 2);
        assert_eq!(out.punches[1].offset, Some(PUNCH_LEN));
        assert_eq!(out.consumed, 2 * PUNCH_LEN);
        assert_eq!(out.error_offset, Some(2 * PUNCH_LEN));
    }

    #[test]
    fn short_punch_has_no_fields() {
        let out = PunchOutput::new(0, Some(0), &Punch::from_bytes(vec![0x02u8, 0xD3, 0x00]));
        assert_eq!(out.serial, None);
        assert_eq!(out.clock, None);
        assert_eq!(out.hex, "02 d3 00");
    }

    #[test]
    fn probe_output_json_shape() {
        let report = ProbeReport {
            flushed_bytes: 4,
            planned_levels: 2,
            levels: vec![LevelReport {
                index: 0,
                punches_sent: 16,
                bytes_sent: 288,
                bytes_received: 0,
                punches_decoded: 0,
                outcome: Err(LevelFailure::EmptyReception),
            }],
        };
        let out = ProbeOutput::new(&report, &ProbeConfig::default());
        let json: serde_json::Value = serde_json::to_value(&out).unwrap();

        assert_eq!(json["policy"], "identifier-keyed");
        assert_eq!(json["passed"], false);
        assert_eq!(json["levels"][0]["failure"]["kind"], "empty-reception");
        assert_eq!(json["levels"][0]["failure"]["exit_code"], 61);
        assert!(json.get("device").is_none());
    }
}
