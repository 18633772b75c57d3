//! Overflow and integrity probe for flow-gated serial punch buffers.
//!
//! A punch buffer sits between several station radios and one host UART and
//! only releases data when the host pulses a gate line. punchprobe fills the
//! buffer with generated punches at escalating load levels, drains it through
//! the gate, and checks that every punch came back intact.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial ports, the gate line and a simulated device
//! - [`frame`]: the 18-byte punch frame and stream decoder
//! - [`verify`]: reference store and match policies
//! - [`probe`]: the gated drain protocol and the level-escalating probe

/// Re-export transport types.
pub mod transport {
    pub use punchprobe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use punchprobe_frame::*;
}

/// Re-export verification types.
pub mod verify {
    pub use punchprobe_verify::*;
}

/// Re-export probe types.
pub mod probe {
    pub use punchprobe_probe::*;
}
