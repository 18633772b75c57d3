use std::fmt;
use std::io;

use punchprobe_probe::{LevelFailure, ProbeError, ProbeReport};
use punchprobe_transport::TransportError;

pub const SUCCESS: i32 = 0;
/// Punches were lost or altered.
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
/// The received stream lost frame synchronization.
pub const DATA_INVALID: i32 = 60;
/// A drain returned nothing although punches were sent.
pub const EMPTY_RECEPTION: i32 = 61;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Open { source, .. }
        | TransportError::Configure { source, .. }
        | TransportError::Gpio { source, .. }
        | TransportError::Io(source)
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            PERMISSION_DENIED
        }
        TransportError::UnsupportedBaud(_) | TransportError::NoSuchChannel { .. } => USAGE,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn probe_error(context: &str, err: ProbeError) -> CliError {
    match err {
        ProbeError::Transport(err) => transport_error(context, err),
        ProbeError::DrainOverrun { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        ProbeError::UnknownSubchannel { .. } | ProbeError::InvalidConfig(_) => {
            CliError::usage(format!("{context}: {err}"))
        }
    }
}

pub fn level_failure_code(failure: &LevelFailure) -> i32 {
    match failure {
        LevelFailure::EmptyReception => EMPTY_RECEPTION,
        LevelFailure::Framing(_) => DATA_INVALID,
        LevelFailure::Verification(_) => FAILURE,
    }
}

/// Exit code of a finished probe run.
pub fn report_code(report: &ProbeReport) -> i32 {
    match report.first_failure().and_then(|level| level.failure()) {
        Some(failure) => level_failure_code(failure),
        None if report.passed() => SUCCESS,
        None => INTERNAL,
    }
}
