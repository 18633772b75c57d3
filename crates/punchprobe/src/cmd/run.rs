use crate::cmd::RunArgs;
use crate::exit::{report_code, CliResult};
use crate::output::{print_probe, OutputFormat, ProbeOutput};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.probe.probe_config();
    let report = hardware::probe(&args, &config)?;

    let out = ProbeOutput::new(&report, &config);
    print_probe(&out, format);
    Ok(report_code(&report))
}

#[cfg(target_os = "linux")]
mod hardware {
    use punchprobe_probe::{DrainTiming, GatedLink, ProbeConfig, ProbeReport};
    use punchprobe_transport::{PortConfig, SysfsGate, TtyPort};
    use tracing::info;

    use crate::cmd::{parse_duration, probe_channel, RunArgs};
    use crate::exit::{probe_error, transport_error, CliResult};

    pub fn probe(args: &RunArgs, config: &ProbeConfig) -> CliResult<ProbeReport> {
        let port_config = PortConfig {
            baud_rate: args.baud,
            read_timeout: parse_duration(&args.read_timeout)?,
        };
        let timing = args.probe.drain_timing(DrainTiming::default())?;

        let ports = args
            .ports
            .iter()
            .map(|path| {
                TtyPort::open(path, &port_config)
                    .map_err(|err| transport_error("failed opening port", err))
            })
            .collect::<CliResult<Vec<_>>>()?;
        let gate = SysfsGate::open(args.gate_gpio, args.gate_polarity.into())
            .map_err(|err| transport_error("failed opening gate", err))?;
        info!(
            ports = ports.len(),
            gate_gpio = args.gate_gpio,
            baud = args.baud,
            "hardware link open"
        );

        let mut link =
            GatedLink::new(ports, gate, timing).map_err(|err| probe_error("link setup failed", err))?;
        probe_channel(config, &mut link)
    }
}

#[cfg(not(target_os = "linux"))]
mod hardware {
    use punchprobe_probe::{ProbeConfig, ProbeReport};

    use crate::cmd::RunArgs;
    use crate::exit::{CliError, CliResult, USAGE};

    pub fn probe(_args: &RunArgs, _config: &ProbeConfig) -> CliResult<ProbeReport> {
        Err(CliError::new(
            USAGE,
            "hardware probing needs Linux sysfs GPIO; use `simulate` instead",
        ))
    }
}
