/// Framing errors raised while splitting a byte stream into punches.
///
/// All variants are terminal for the stream being decoded: the framer never
/// attempts to resynchronize.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The header byte was not found where the current frame boundary puts it.
    #[error("punch header not found at offset {offset} (found {found:?})")]
    Desynchronized { offset: usize, found: Option<u8> },

    /// The preamble byte at a frame boundary is wrong.
    #[error("punch preamble not found at offset {offset} (found 0x{found:02x})")]
    BadPreamble { offset: usize, found: u8 },

    /// The length byte does not carry the expected payload length.
    #[error("unexpected punch length {found} at offset {offset} (expected {expected})")]
    UnexpectedLength {
        offset: usize,
        found: u8,
        expected: u8,
    },

    /// The stream ended inside a frame.
    #[error("truncated punch at offset {offset} ({available} of {needed} bytes)")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

impl FrameError {
    /// Byte offset of the frame boundary where decoding stopped.
    pub fn offset(&self) -> usize {
        match self {
            FrameError::Desynchronized { offset, .. }
            | FrameError::BadPreamble { offset, .. }
            | FrameError::UnexpectedLength { offset, .. }
            | FrameError::Truncated { offset, .. } => *offset,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
