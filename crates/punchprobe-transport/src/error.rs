use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to apply line settings to the serial device.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested baud rate has no termios equivalent.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaud(u32),

    /// Failed to export or drive a GPIO line.
    #[error("gpio {pin}: {source}")]
    Gpio { pin: u32, source: std::io::Error },

    /// The simulated device has no input channel with this index.
    #[error("no such channel {channel} (device has {channels})")]
    NoSuchChannel { channel: usize, channels: usize },

    /// An I/O error occurred on an open port.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
