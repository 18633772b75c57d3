//! Software model of the serial buffer device.
//!
//! The device has one input UART per station channel and a single output
//! UART that is throttled by the burst gate. Every input channel owns a
//! bounded byte queue. Whole writes that do not fit in the queue are dropped
//! silently, the way a full device buffer loses punches. Each ENABLE edge on
//! the gate lets the device relay up to `burst_bytes` bytes to the host.
//! Complete punches are relayed round-robin across channels, and a punch that
//! has started going out always finishes before another channel is served.
//!
//! Port 0 is the duplex port: writes go into channel 0 and reads return the
//! relayed stream. Other ports are transmit-only.
//!
//! The device is single-threaded; ports and gate share state through
//! `Rc<RefCell<_>>`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::traits::{GateLevel, GateLine, SerialPort};

/// Record-type marker the device keys punch assembly on.
const PUNCH_HEADER: u8 = 0xD3;
/// Preamble, header, length and two checksum bytes around the payload.
const PUNCH_OVERHEAD: usize = 5;

/// Simulated device parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    /// Number of input channels (one per station). Default: 2.
    pub channels: usize,
    /// Receive queue size per channel, in bytes. Default: 10 KiB.
    pub capacity: usize,
    /// Bytes relayed to the host per gate pulse. Default: 64.
    pub burst_bytes: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            capacity: 10 * 1024,
            burst_bytes: 64,
        }
    }
}

/// Running counters of the simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimStats {
    pub bytes_accepted: usize,
    pub writes_dropped: usize,
    pub bytes_dropped: usize,
    pub bytes_relayed: usize,
    pub gate_pulses: usize,
}

#[derive(Debug)]
struct DeviceState {
    config: SimConfig,
    inputs: Vec<VecDeque<u8>>,
    host_rx: VecDeque<u8>,
    /// Channel and remaining byte count of the punch currently going out.
    in_flight: Option<(usize, usize)>,
    next_channel: usize,
    gate: GateLevel,
    stats: SimStats,
}

impl DeviceState {
    fn accept(&mut self, channel: usize, data: &[u8]) {
        let capacity = self.config.capacity;
        let queue = &mut self.inputs[channel];
        if queue.len() + data.len() > capacity {
            self.stats.writes_dropped += 1;
            self.stats.bytes_dropped += data.len();
            warn!(
                channel,
                len = data.len(),
                queued = queue.len(),
                "device buffer full, write dropped"
            );
            return;
        }
        queue.extend(data.iter().copied());
        self.stats.bytes_accepted += data.len();
    }

    fn set_gate(&mut self, level: GateLevel) {
        if level == GateLevel::Enable && self.gate == GateLevel::Disable {
            self.stats.gate_pulses += 1;
            let relayed = self.release(self.config.burst_bytes);
            debug!(relayed, "gate pulse");
        }
        self.gate = level;
    }

    fn release(&mut self, mut budget: usize) -> usize {
        let mut relayed = 0;
        while budget > 0 {
            let (channel, remaining) = match self.in_flight.take().or_else(|| self.next_punch()) {
                Some(next) => next,
                None => break,
            };

            let queue = &mut self.inputs[channel];
            let n = remaining.min(budget).min(queue.len());
            self.host_rx.extend(queue.drain(..n));
            budget -= n;
            relayed += n;

            // A short queue ends the punch early; the rest never arrived.
            if n < remaining && !queue.is_empty() {
                self.in_flight = Some((channel, remaining - n));
            }
        }
        self.stats.bytes_relayed += relayed;
        relayed
    }

    /// Pick the next channel with queued data and size its leading punch.
    fn next_punch(&mut self) -> Option<(usize, usize)> {
        let channels = self.inputs.len();
        for step in 0..channels {
            let channel = (self.next_channel + step) % channels;
            let queue = &self.inputs[channel];
            if queue.is_empty() {
                continue;
            }
            self.next_channel = (channel + 1) % channels;

            let len = match (queue.get(1), queue.get(2)) {
                (Some(&PUNCH_HEADER), Some(&length)) => length as usize + PUNCH_OVERHEAD,
                // Unframed data is relayed as it is.
                _ => queue.len(),
            };
            return Some((channel, len));
        }
        None
    }
}

/// Handle to a simulated serial buffer device.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    state: Rc<RefCell<DeviceState>>,
}

impl SimulatedDevice {
    pub fn new(config: SimConfig) -> Self {
        let state = DeviceState {
            config,
            inputs: vec![VecDeque::new(); config.channels],
            host_rx: VecDeque::new(),
            in_flight: None,
            next_channel: 0,
            gate: GateLevel::Disable,
            stats: SimStats::default(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Serial port attached to input `channel`.
    pub fn port(&self, channel: usize) -> Result<SimPort> {
        let channels = self.state.borrow().config.channels;
        if channel >= channels {
            return Err(TransportError::NoSuchChannel { channel, channels });
        }
        Ok(SimPort {
            state: Rc::clone(&self.state),
            channel,
        })
    }

    /// One port per input channel, in channel order.
    pub fn ports(&self) -> Vec<SimPort> {
        let channels = self.state.borrow().config.channels;
        (0..channels)
            .map(|channel| SimPort {
                state: Rc::clone(&self.state),
                channel,
            })
            .collect()
    }

    /// The device's burst gate input.
    pub fn gate(&self) -> SimGate {
        SimGate {
            state: Rc::clone(&self.state),
        }
    }

    pub fn config(&self) -> SimConfig {
        self.state.borrow().config
    }

    pub fn stats(&self) -> SimStats {
        self.state.borrow().stats
    }

    /// Bytes held in the device's input queues.
    pub fn buffered(&self) -> usize {
        self.state.borrow().inputs.iter().map(VecDeque::len).sum()
    }

    /// Bytes relayed to the host but not yet read.
    pub fn host_pending(&self) -> usize {
        self.state.borrow().host_rx.len()
    }

    /// Place bytes in the device's input queue directly, bypassing capacity.
    /// Models data left over from an earlier run.
    pub fn preload(&self, channel: usize, data: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let channels = state.inputs.len();
        let queue = state
            .inputs
            .get_mut(channel)
            .ok_or(TransportError::NoSuchChannel { channel, channels })?;
        queue.extend(data.iter().copied());
        Ok(())
    }
}

/// Serial port of a [`SimulatedDevice`].
#[derive(Debug)]
pub struct SimPort {
    state: Rc<RefCell<DeviceState>>,
    channel: usize,
}

impl SimPort {
    pub fn channel(&self) -> usize {
        self.channel
    }

    fn is_duplex(&self) -> bool {
        self.channel == 0
    }
}

impl SerialPort for SimPort {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.state.borrow_mut().accept(self.channel, data);
        Ok(())
    }

    fn output_pending(&self) -> Result<usize> {
        Ok(0)
    }

    fn bytes_available(&self) -> Result<usize> {
        if !self.is_duplex() {
            return Ok(0);
        }
        Ok(self.state.borrow().host_rx.len())
    }

    fn read_available(&mut self, dst: &mut Vec<u8>) -> Result<usize> {
        if !self.is_duplex() {
            return Ok(0);
        }
        let mut state = self.state.borrow_mut();
        let n = state.host_rx.len();
        dst.extend(state.host_rx.drain(..));
        Ok(n)
    }
}

/// Burst gate input of a [`SimulatedDevice`].
#[derive(Debug)]
pub struct SimGate {
    state: Rc<RefCell<DeviceState>>,
}

impl GateLine for SimGate {
    fn set(&mut self, level: GateLevel) -> Result<()> {
        self.state.borrow_mut().set_gate(level);
        Ok(())
    }
}
