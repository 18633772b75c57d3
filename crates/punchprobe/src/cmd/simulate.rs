use punchprobe_probe::{DrainTiming, GatedLink};
use punchprobe_transport::{SimConfig, SimulatedDevice};
use tracing::info;

use crate::cmd::{probe_channel, SimulateArgs};
use crate::exit::{probe_error, report_code, CliError, CliResult};
use crate::output::{print_probe, DeviceOutput, OutputFormat, ProbeOutput};

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    if args.channels == 0 || args.burst == 0 {
        return Err(CliError::usage(
            "--channels and --burst must be greater than zero",
        ));
    }

    let sim_config = SimConfig {
        channels: args.channels,
        capacity: args.capacity,
        burst_bytes: args.burst,
    };
    let device = SimulatedDevice::new(sim_config);
    let timing = args.probe.drain_timing(DrainTiming::immediate())?;
    let config = args.probe.probe_config();
    info!(
        channels = sim_config.channels,
        capacity = sim_config.capacity,
        burst = sim_config.burst_bytes,
        "simulated device ready"
    );

    let mut link = GatedLink::new(device.ports(), device.gate(), timing)
        .map_err(|err| probe_error("link setup failed", err))?;
    let report = probe_channel(&config, &mut link)?;

    let out = ProbeOutput::new(&report, &config)
        .with_device(DeviceOutput::new(device.config(), device.stats()));
    print_probe(&out, format);
    Ok(report_code(&report))
}
