use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use punchprobe_frame::DecodeConfig;
use punchprobe_probe::{
    DrainTiming, FlowGatedChannel, OverflowProbe, ProbeConfig, ProbeReport, DEFAULT_LEVELS,
};
use punchprobe_transport::GatePolarity;
use punchprobe_verify::MatchPolicy;

use crate::exit::{probe_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod generate;
pub mod run;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe a punch buffer on real serial ports and a GPIO gate.
    Run(RunArgs),
    /// Probe a simulated punch buffer.
    Simulate(SimulateArgs),
    /// Print a generated reference punch set.
    Generate(GenerateArgs),
    /// Decode a captured byte stream.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Generate(args) => generate::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// i-th received punch must equal i-th sent punch.
    Positional,
    /// Match received punches to sent ones by serial id.
    Keyed,
}

impl From<PolicyArg> for MatchPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Positional => MatchPolicy::Positional,
            PolicyArg::Keyed => MatchPolicy::IdentifierKeyed,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolarityArg {
    ActiveLow,
    ActiveHigh,
}

impl From<PolarityArg> for GatePolarity {
    fn from(arg: PolarityArg) -> Self {
        match arg {
            PolarityArg::ActiveLow => GatePolarity::ActiveLow,
            PolarityArg::ActiveHigh => GatePolarity::ActiveHigh,
        }
    }
}

/// Options shared by `run` and `simulate`.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Punch count per load level (comma-separated).
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_LEVELS)]
    pub levels: Vec<usize>,
    /// Stations to spread punches across. Each station transmits on its own port.
    #[arg(long, default_value = "2")]
    pub stations: u16,
    /// How received punches are matched to sent ones.
    #[arg(long, value_enum, default_value = "keyed")]
    pub policy: PolicyArg,
    /// Seed for station selection (random when omitted).
    #[arg(long)]
    pub seed: Option<u64>,
    /// Drains run before the first level to clear stale data.
    #[arg(long, default_value = "2")]
    pub flush_cycles: usize,
    /// Accept any length byte and skip the preamble check when decoding.
    #[arg(long)]
    pub lenient: bool,
    /// Gate ENABLE hold time per pulse (e.g. 1ms).
    #[arg(long)]
    pub gate_pulse: Option<String>,
    /// Wait after each gate pulse for the burst to arrive (e.g. 10ms).
    #[arg(long)]
    pub settle: Option<String>,
    /// Poll interval while transmit output drains (e.g. 1ms).
    #[arg(long)]
    pub tx_poll: Option<String>,
    /// Gate cycles allowed in one drain before giving up.
    #[arg(long)]
    pub max_cycles: Option<usize>,
}

impl ProbeArgs {
    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            levels: self.levels.clone(),
            stations: self.stations,
            policy: self.policy.into(),
            flush_cycles: self.flush_cycles,
            seed: self.seed,
            decode: if self.lenient {
                DecodeConfig::lenient()
            } else {
                DecodeConfig::default()
            },
        }
    }

    /// Apply timing overrides on top of `base`.
    pub fn drain_timing(&self, base: DrainTiming) -> CliResult<DrainTiming> {
        let mut timing = base;
        if let Some(value) = &self.gate_pulse {
            timing.gate_pulse = parse_duration(value)?;
        }
        if let Some(value) = &self.settle {
            timing.settle = parse_duration(value)?;
        }
        if let Some(value) = &self.tx_poll {
            timing.tx_poll = parse_duration(value)?;
        }
        if let Some(max_cycles) = self.max_cycles {
            if max_cycles == 0 {
                return Err(CliError::usage("--max-cycles must be greater than zero"));
            }
            timing.max_cycles = max_cycles;
        }
        Ok(timing)
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Serial port per station, in station order. The first port also receives.
    #[arg(
        long = "port",
        required = true,
        env = "PUNCHPROBE_PORTS",
        value_delimiter = ','
    )]
    pub ports: Vec<PathBuf>,
    /// GPIO number of the burst gate line.
    #[arg(long, env = "PUNCHPROBE_GATE_GPIO")]
    pub gate_gpio: u32,
    /// Line level that enables the gate.
    #[arg(long, value_enum, default_value = "active-low")]
    pub gate_polarity: PolarityArg,
    /// Line speed of every port.
    #[arg(long, default_value = "38400")]
    pub baud: u32,
    /// Read timeout of every port (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub read_timeout: String,
    #[command(flatten)]
    pub probe: ProbeArgs,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Input channels of the simulated device.
    #[arg(long, default_value = "2")]
    pub channels: usize,
    /// Receive queue size per channel, in bytes.
    #[arg(long, default_value = "10240")]
    pub capacity: usize,
    /// Bytes released per gate pulse.
    #[arg(long, default_value = "64")]
    pub burst: usize,
    #[command(flatten)]
    pub probe: ProbeArgs,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Number of punches.
    pub count: usize,
    /// Stations to draw from.
    #[arg(long, default_value = "2")]
    pub stations: u16,
    /// Seed for station selection (random when omitted).
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Captured stream. Use `-` for stdin.
    pub input: PathBuf,
    /// Input is hex text (whitespace ignored) instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
    /// Accept any length byte and skip the preamble check.
    #[arg(long)]
    pub lenient: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Run a probe to completion over `channel`.
pub fn probe_channel<C: FlowGatedChannel + ?Sized>(
    config: &ProbeConfig,
    channel: &mut C,
) -> CliResult<ProbeReport> {
    OverflowProbe::new(config.clone())
        .run(channel)
        .map_err(|err| probe_error("probe aborted", err))
}

/// Parse `10ms`, `2s` or a bare number of seconds. Zero is allowed.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_args() -> ProbeArgs {
        ProbeArgs {
            levels: DEFAULT_LEVELS.to_vec(),
            stations: 2,
            policy: PolicyArg::Keyed,
            seed: None,
            flush_cycles: 2,
            lenient: false,
            gate_pulse: None,
            settle: None,
            tx_poll: None,
            max_cycles: None,
        }
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("0ms").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn timing_overrides_apply_on_base() {
        let args = ProbeArgs {
            settle: Some("25ms".into()),
            max_cycles: Some(10),
            ..probe_args()
        };
        let timing = args.drain_timing(DrainTiming::default()).unwrap();

        assert_eq!(timing.settle, Duration::from_millis(25));
        assert_eq!(timing.gate_pulse, Duration::from_millis(1));
        assert_eq!(timing.max_cycles, 10);
    }

    #[test]
    fn zero_max_cycles_is_usage_error() {
        let args = ProbeArgs {
            max_cycles: Some(0),
            ..probe_args()
        };
        let err = args.drain_timing(DrainTiming::immediate()).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }

    #[test]
    fn probe_config_maps_policy_and_decode_mode() {
        let args = ProbeArgs {
            policy: PolicyArg::Positional,
            lenient: true,
            ..probe_args()
        };
        let config = args.probe_config();

        assert_eq!(config.policy, MatchPolicy::Positional);
        assert_eq!(config.decode, DecodeConfig::lenient());
        assert_eq!(config.levels, DEFAULT_LEVELS.to_vec());
    }
}
