/// Verification failures.
///
/// These are results, not aborts: the verifier reports the first failure it
/// finds and leaves the decision to stop to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// The number of received punches differs from the number sent.
    #[error("{expected} punches sent, {received} punches received")]
    CountMismatch { expected: usize, received: usize },

    /// A received punch differs from the reference punch it was matched to.
    #[error("received punch #{index} differs from reference (serial {serial:?})")]
    ContentMismatch { index: usize, serial: Option<u32> },

    /// A received punch carries a serial id that addresses no reference punch.
    #[error("received punch #{index} has unknown serial {serial:?}")]
    UnknownSerial { index: usize, serial: Option<u32> },

    /// A serial id that already matched an earlier received punch.
    /// With equal counts this means another punch was lost.
    #[error("received punch #{index} repeats serial {serial}")]
    DuplicateSerial { index: usize, serial: u32 },
}

pub type Result<T> = std::result::Result<T, VerifyError>;
