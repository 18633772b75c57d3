use std::time::Duration;

use crate::error::Result;

/// Default line rate of the serial buffer device.
pub const DEFAULT_BAUD_RATE: u32 = 38_400;

/// A byte-oriented serial port.
///
/// Line settings are fixed at 8 data bits, no parity, one stop bit. Only the
/// queries the drain protocol needs are exposed; everything else about the
/// port is the backend's business.
pub trait SerialPort {
    /// Queue `data` for transmission. Returns once the bytes are handed to
    /// the driver, not once they are on the wire.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Bytes written but not yet transmitted.
    fn output_pending(&self) -> Result<usize>;

    /// Bytes received and ready to read without blocking.
    fn bytes_available(&self) -> Result<usize>;

    /// Append everything that is already buffered to `dst` without blocking.
    /// Returns the number of bytes appended.
    fn read_available(&mut self, dst: &mut Vec<u8>) -> Result<usize>;
}

impl<T: SerialPort + ?Sized> SerialPort for Box<T> {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }

    fn output_pending(&self) -> Result<usize> {
        (**self).output_pending()
    }

    fn bytes_available(&self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read_available(&mut self, dst: &mut Vec<u8>) -> Result<usize> {
        (**self).read_available(dst)
    }
}

/// Logical state of the burst gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateLevel {
    /// The device may release buffered data.
    Enable,
    /// The device must hold buffered data.
    Disable,
}

/// Electrical mapping of [`GateLevel`] onto the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatePolarity {
    /// ENABLE drives the line low (RTS-style).
    #[default]
    ActiveLow,
    /// ENABLE drives the line high.
    ActiveHigh,
}

impl GatePolarity {
    /// Whether the line should be driven high for `level`.
    pub fn is_high(self, level: GateLevel) -> bool {
        match (self, level) {
            (GatePolarity::ActiveLow, GateLevel::Enable) => false,
            (GatePolarity::ActiveLow, GateLevel::Disable) => true,
            (GatePolarity::ActiveHigh, GateLevel::Enable) => true,
            (GatePolarity::ActiveHigh, GateLevel::Disable) => false,
        }
    }
}

/// A binary output line used as the burst gate.
pub trait GateLine {
    fn set(&mut self, level: GateLevel) -> Result<()>;
}

impl<T: GateLine + ?Sized> GateLine for Box<T> {
    fn set(&mut self, level: GateLevel) -> Result<()> {
        (**self).set(level)
    }
}

/// Serial port settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    /// Line rate in baud. Default: 38400.
    pub baud_rate: u32,
    /// Upper bound on a blocking read. Default: 1 s.
    pub read_timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_secs(1),
        }
    }
}
