//! Serial port and gate line abstraction.
//!
//! The probe only needs a handful of capabilities from the hardware:
//! - [`SerialPort`]: write bytes, ask how much output is still pending, ask
//!   how much input is buffered, and read what is buffered without blocking
//! - [`GateLine`]: drive the out-of-band burst gate ENABLE or DISABLE
//!
//! Backends:
//! - [`TtyPort`]: a Unix TTY in raw 8N1 mode (Unix)
//! - [`SysfsGate`]: a sysfs GPIO output line (Linux)
//! - [`sim`]: a software model of the serial buffer device, for tests and
//!   hardware-free runs

pub mod error;
#[cfg(target_os = "linux")]
pub mod gpio;
pub mod sim;
pub mod traits;
#[cfg(unix)]
pub mod tty;

pub use error::{Result, TransportError};
#[cfg(target_os = "linux")]
pub use gpio::SysfsGate;
pub use sim::{SimConfig, SimGate, SimPort, SimStats, SimulatedDevice};
pub use traits::{GateLevel, GateLine, GatePolarity, PortConfig, SerialPort};
#[cfg(unix)]
pub use tty::TtyPort;
