use std::io::Read;
use std::path::Path;

use punchprobe_frame::{decode_stream_with, DecodeConfig};
use tracing::warn;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decoded, DecodeOutput, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = read_input(&args.input)?;
    let stream = if args.hex {
        parse_hex(&String::from_utf8_lossy(&raw))?
    } else {
        raw
    };

    let config = if args.lenient {
        DecodeConfig::lenient()
    } else {
        DecodeConfig::default()
    };
    let len = stream.len();
    let decoded = decode_stream_with(stream, &config);
    if let Some(err) = &decoded.error {
        warn!(offset = err.offset(), decoded = decoded.punches.len(), "stream lost sync");
    }

    print_decoded(&DecodeOutput::new(len, &decoded), format);
    Ok(if decoded.is_clean() { SUCCESS } else { DATA_INVALID })
}

fn read_input(path: &Path) -> CliResult<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|err| io_error("failed reading stdin", err))?;
        return Ok(buf);
    }
    std::fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

/// Parse hex text such as `02 d3 0d` or `02D30D`. Whitespace is ignored.
fn parse_hex(text: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::usage("hex input has an odd number of digits"));
    }

    digits
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            if !pair.iter().all(u8::is_ascii_hexdigit) {
                return Err(CliError::usage(format!("invalid hex byte #{i}")));
            }
            let pair = std::str::from_utf8(pair).unwrap_or_default();
            u8::from_str_radix(pair, 16)
                .map_err(|_| CliError::usage(format!("invalid hex byte #{i}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_spaced_and_packed() {
        assert_eq!(parse_hex("02 d3 0d").unwrap(), vec![0x02, 0xD3, 0x0D]);
        assert_eq!(parse_hex("02D3\n0dAB").unwrap(), vec![0x02, 0xD3, 0x0D, 0xAB]);
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        assert!(parse_hex("0").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("+1").is_err());
    }
}
