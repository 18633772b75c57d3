use std::time::Duration;

use punchprobe_transport::{GateLevel, GateLine, SerialPort};
use tracing::{debug, trace};

use crate::error::{ProbeError, Result};

/// A duplex byte channel whose receive side is released in gated bursts.
///
/// This is everything the probe needs from the hardware. [`GatedLink`] is
/// the implementation over real (or simulated) ports and a gate line.
pub trait FlowGatedChannel {
    /// Number of logical transmit sub-channels.
    fn subchannels(&self) -> usize;

    /// Send one frame on `subchannel` and wait until it has left the port.
    fn transmit(&mut self, frame: &[u8], subchannel: usize) -> Result<()>;

    /// Pulse the gate until a pulse yields nothing; return everything read.
    fn gated_drain(&mut self) -> Result<Vec<u8>>;
}

/// Settle-time assumptions of the drain protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainTiming {
    /// How long the gate is held ENABLE per pulse. Default: 1 ms.
    pub gate_pulse: Duration,
    /// Wait after DISABLE for the burst to arrive. Default: 10 ms.
    pub settle: Duration,
    /// Poll interval while waiting for transmit output to drain. Default: 1 ms.
    pub tx_poll: Duration,
    /// Gate cycles allowed in one drain before giving up. Default: 100 000.
    pub max_cycles: usize,
}

impl DrainTiming {
    /// No sleeps at all. For devices that react synchronously (the simulator).
    pub fn immediate() -> Self {
        Self {
            gate_pulse: Duration::ZERO,
            settle: Duration::ZERO,
            tx_poll: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl Default for DrainTiming {
    fn default() -> Self {
        Self {
            gate_pulse: Duration::from_millis(1),
            settle: Duration::from_millis(10),
            tx_poll: Duration::from_millis(1),
            max_cycles: 100_000,
        }
    }
}

/// Flow-gated channel over serial ports and a gate line.
///
/// Port `i` carries sub-channel `i`. Port 0 is also the shared receive path.
pub struct GatedLink<P, G> {
    ports: Vec<P>,
    gate: G,
    timing: DrainTiming,
}

impl<P: SerialPort, G: GateLine> GatedLink<P, G> {
    pub fn new(ports: Vec<P>, gate: G, timing: DrainTiming) -> Result<Self> {
        if ports.is_empty() {
            return Err(ProbeError::InvalidConfig(
                "gated link needs at least one port".to_string(),
            ));
        }
        Ok(Self {
            ports,
            gate,
            timing,
        })
    }

    pub fn timing(&self) -> &DrainTiming {
        &self.timing
    }

    /// Borrow the ports.
    pub fn ports(&self) -> &[P] {
        &self.ports
    }

    /// Borrow the gate line.
    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Consume the link and return its parts.
    pub fn into_parts(self) -> (Vec<P>, G) {
        (self.ports, self.gate)
    }

    fn pulse_gate(&mut self) -> Result<()> {
        self.gate.set(GateLevel::Enable)?;
        pause(self.timing.gate_pulse);
        self.gate.set(GateLevel::Disable)?;
        pause(self.timing.settle);
        Ok(())
    }
}

impl<P: SerialPort, G: GateLine> FlowGatedChannel for GatedLink<P, G> {
    fn subchannels(&self) -> usize {
        self.ports.len()
    }

    fn transmit(&mut self, frame: &[u8], subchannel: usize) -> Result<()> {
        let available = self.ports.len();
        let port = self
            .ports
            .get_mut(subchannel)
            .ok_or(ProbeError::UnknownSubchannel {
                subchannel,
                available,
            })?;

        port.write_all(frame)?;
        while port.output_pending()? > 0 {
            pause(self.timing.tx_poll);
        }
        trace!(subchannel, len = frame.len(), "frame transmitted");
        Ok(())
    }

    fn gated_drain(&mut self) -> Result<Vec<u8>> {
        let mut stream = Vec::new();
        let mut cycles = 0usize;

        loop {
            if cycles >= self.timing.max_cycles {
                return Err(ProbeError::DrainOverrun {
                    cycles,
                    bytes: stream.len(),
                });
            }
            cycles += 1;

            self.pulse_gate()?;

            let rx = &mut self.ports[0];
            if rx.bytes_available()? == 0 {
                break;
            }
            // A port that reports data but yields none, or never runs dry,
            // falls through to the next pulse and so counts against max_cycles.
            for _ in 0..MAX_READS_PER_CYCLE {
                if rx.read_available(&mut stream)? == 0 || rx.bytes_available()? == 0 {
                    break;
                }
            }
        }

        debug!(cycles, bytes = stream.len(), "gated drain complete");
        Ok(stream)
    }
}

impl<P, G> std::fmt::Debug for GatedLink<P, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatedLink")
            .field("ports", &self.ports.len())
            .field("timing", &self.timing)
            .finish()
    }
}

/// Reads allowed after one gate pulse before pulsing again.
const MAX_READS_PER_CYCLE: usize = 256;

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
