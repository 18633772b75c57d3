/// Errors that abort a probe run.
///
/// Level failures (nothing received, framing, verification) are not errors;
/// they are reported in [`crate::LevelReport`].
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] punchprobe_transport::TransportError),

    /// A punch was addressed to a sub-channel the link does not have.
    #[error("sub-channel {subchannel} not available ({available} configured)")]
    UnknownSubchannel { subchannel: usize, available: usize },

    /// The device kept producing data for more gate cycles than allowed.
    #[error("drain did not go quiet after {cycles} gate cycles ({bytes} bytes read)")]
    DrainOverrun { cycles: usize, bytes: usize },

    /// The probe configuration cannot be run on this link.
    #[error("invalid probe configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
