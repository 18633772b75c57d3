use punchprobe_probe::PunchGenerator;

use crate::cmd::GenerateArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_generated, GenerateOutput, OutputFormat, PunchOutput};

pub fn run(args: GenerateArgs, format: OutputFormat) -> CliResult<i32> {
    let store = PunchGenerator::new(args.seed).generate(args.count, args.stations);

    let out = GenerateOutput {
        stations: args.stations.max(1),
        count: store.len(),
        bytes: store.wire_size(),
        punches: store
            .iter()
            .enumerate()
            .map(|(index, punch)| PunchOutput::new(index, None, punch))
            .collect(),
    };
    print_generated(&out, format);
    Ok(SUCCESS)
}
