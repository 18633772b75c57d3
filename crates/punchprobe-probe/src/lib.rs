//! Overflow probing of a punch buffer device.
//!
//! This is the layer that drives a test run: transmit generated punches
//! across station channels, pulse the burst gate to drain the device, decode
//! what came back and verify it against what was sent, one load level at a
//! time.

pub mod error;
pub mod generator;
pub mod link;
pub mod probe;

pub use error::{ProbeError, Result};
pub use generator::PunchGenerator;
pub use link::{DrainTiming, FlowGatedChannel, GatedLink};
pub use probe::{
    LevelFailure, LevelReport, OverflowProbe, ProbeConfig, ProbeReport, DEFAULT_LEVELS,
};
