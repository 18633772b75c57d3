use punchprobe_frame::{decode_stream_with, DecodeConfig, FrameError};
use punchprobe_verify::{verify, MatchPolicy, VerifyError, Verified};
use tracing::{error, info, warn};

use crate::error::{ProbeError, Result};
use crate::generator::PunchGenerator;
use crate::link::FlowGatedChannel;

/// Default load levels. The last one is sized to overrun a 10 KiB device
/// buffer, which validates that the probe can see a failure at all.
pub const DEFAULT_LEVELS: [usize; 4] = [16, 128, 1024, 10 * 1024 + 10];

/// Default number of drains run before the first level.
pub const DEFAULT_FLUSH_CYCLES: usize = 2;

/// Configuration for an overflow probe run.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Punch count of each level, in the order they are run.
    pub levels: Vec<usize>,
    /// Stations (sub-channels) punches are spread across. Default: 2.
    pub stations: u16,
    /// How received punches are matched to sent ones.
    pub policy: MatchPolicy,
    /// Drains run before the first level to clear stale data. Default: 2.
    pub flush_cycles: usize,
    /// Seed for station selection. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Frame recognition rules for decoding received streams.
    pub decode: DecodeConfig,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS.to_vec(),
            stations: 2,
            policy: MatchPolicy::default(),
            flush_cycles: DEFAULT_FLUSH_CYCLES,
            seed: None,
            decode: DecodeConfig::default(),
        }
    }
}

impl ProbeConfig {
    /// Check the configuration against a channel with `subchannels` paths.
    pub fn validate(&self, subchannels: usize) -> Result<()> {
        if self.stations == 0 {
            return Err(ProbeError::InvalidConfig(
                "at least one station is required".to_string(),
            ));
        }
        if usize::from(self.stations) > subchannels {
            return Err(ProbeError::InvalidConfig(format!(
                "{} stations requested but the link has {} sub-channels",
                self.stations, subchannels
            )));
        }
        if let Some(level) = self.levels.iter().find(|&&l| l > u32::MAX as usize) {
            return Err(ProbeError::InvalidConfig(format!(
                "level of {level} punches exceeds the serial id range"
            )));
        }
        Ok(())
    }
}

/// Why a level failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelFailure {
    /// The drain returned no bytes although punches were sent.
    #[error("nothing received")]
    EmptyReception,

    /// The received stream could not be split into punches.
    #[error("framing error: {0}")]
    Framing(#[from] FrameError),

    /// The received punches do not match the sent ones.
    #[error("verification failed: {0}")]
    Verification(#[from] VerifyError),
}

/// Outcome of one load level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelReport {
    /// Position of the level in the run, from 0.
    pub index: usize,
    pub punches_sent: usize,
    pub bytes_sent: usize,
    pub bytes_received: usize,
    pub punches_decoded: usize,
    pub outcome: std::result::Result<Verified, LevelFailure>,
}

impl LevelReport {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn failure(&self) -> Option<&LevelFailure> {
        self.outcome.as_ref().err()
    }
}

/// Outcome of a probe run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Stale bytes discarded by the flush drains.
    pub flushed_bytes: usize,
    /// Number of levels the run was configured with.
    pub planned_levels: usize,
    /// Reports of the levels that ran. The run stops after the first failure.
    pub levels: Vec<LevelReport>,
}

impl ProbeReport {
    /// True when every planned level ran and passed.
    pub fn passed(&self) -> bool {
        self.levels.len() == self.planned_levels && self.levels.iter().all(LevelReport::passed)
    }

    pub fn first_failure(&self) -> Option<&LevelReport> {
        self.levels.iter().find(|level| !level.passed())
    }
}

/// Drives escalating load levels through a flow-gated channel.
#[derive(Debug)]
pub struct OverflowProbe {
    config: ProbeConfig,
    generator: PunchGenerator,
}

impl OverflowProbe {
    pub fn new(config: ProbeConfig) -> Self {
        let generator = PunchGenerator::new(config.seed);
        Self { config, generator }
    }

    /// Use a custom generator (e.g. one with a fixed clock).
    pub fn with_generator(mut self, generator: PunchGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run every level, stopping at the first failure.
    pub fn run<C: FlowGatedChannel + ?Sized>(&mut self, channel: &mut C) -> Result<ProbeReport> {
        self.run_with(channel, |_| {})
    }

    /// Like [`OverflowProbe::run`], calling `on_level` after each level.
    pub fn run_with<C, F>(&mut self, channel: &mut C, mut on_level: F) -> Result<ProbeReport>
    where
        C: FlowGatedChannel + ?Sized,
        F: FnMut(&LevelReport),
    {
        self.config.validate(channel.subchannels())?;

        let mut report = ProbeReport {
            planned_levels: self.config.levels.len(),
            ..ProbeReport::default()
        };

        for cycle in 0..self.config.flush_cycles {
            let stale = channel.gated_drain()?;
            if !stale.is_empty() {
                warn!(cycle, bytes = stale.len(), "flushed stale data from device");
            }
            report.flushed_bytes += stale.len();
        }

        let levels = self.config.levels.clone();
        for (index, load) in levels.into_iter().enumerate() {
            let level = self.run_level(index, load, channel)?;
            on_level(&level);
            let passed = level.passed();
            report.levels.push(level);
            if !passed {
                break;
            }
        }

        Ok(report)
    }

    /// Generate, transmit, drain, decode and verify one level.
    fn run_level<C: FlowGatedChannel + ?Sized>(
        &mut self,
        index: usize,
        load: usize,
        channel: &mut C,
    ) -> Result<LevelReport> {
        let reference = self.generator.generate(load, self.config.stations);

        info!(level = index, punches = load, "tx started");
        for punch in &reference {
            // Stations are drawn below `stations`, which validate() bounds.
            let station = punch.station().unwrap_or_default();
            channel.transmit(punch.as_bytes(), usize::from(station))?;
        }

        info!(level = index, expecting = load, "rx started");
        let stream = channel.gated_drain()?;

        let mut level = LevelReport {
            index,
            punches_sent: load,
            bytes_sent: reference.wire_size(),
            bytes_received: stream.len(),
            punches_decoded: 0,
            outcome: Err(LevelFailure::EmptyReception),
        };

        if stream.is_empty() && load > 0 {
            error!(level = index, "nothing received");
            return Ok(level);
        }

        let decoded = decode_stream_with(stream, &self.config.decode);
        level.punches_decoded = decoded.punches.len();
        level.outcome = match decoded.error {
            Some(err) => Err(LevelFailure::Framing(err)),
            None => verify(self.config.policy, &decoded.punches, &reference)
                .map_err(LevelFailure::Verification),
        };

        match &level.outcome {
            Ok(verified) => info!(
                level = index,
                punches = verified.matched,
                bytes = level.bytes_received,
                "level passed"
            ),
            Err(failure) => error!(
                level = index,
                decoded = level.punches_decoded,
                bytes = level.bytes_received,
                %failure,
                "level failed"
            ),
        }

        Ok(level)
    }
}
