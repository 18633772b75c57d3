use punchprobe_frame::{Punch, PunchFields, PunchTime};
use punchprobe_verify::ReferenceStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Synthesizes the reference punches of a load level.
///
/// Punch `i` gets serial id and store index `i`, a station drawn uniformly
/// from `[0, stations)`, and the clock's time at generation.
pub struct PunchGenerator {
    rng: StdRng,
    clock: fn() -> PunchTime,
}

impl PunchGenerator {
    /// A generator seeded from `seed`, or from OS entropy when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            clock: PunchTime::now,
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: fn() -> PunchTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn generate(&mut self, count: usize, stations: u16) -> ReferenceStore {
        let stations = stations.max(1);
        (0..count)
            .map(|i| {
                let index = i as u32;
                Punch::encode(&PunchFields {
                    station: self.rng.gen_range(0..stations),
                    serial: index,
                    store_index: index,
                    time: (self.clock)(),
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for PunchGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PunchGenerator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use punchprobe_frame::PUNCH_LEN;

    use super::*;

    fn fixed_time() -> PunchTime {
        PunchTime {
            day_flags: 0x05,
            time_of_day: 4321,
            sub_second: 17,
        }
    }

    #[test]
    fn serials_and_store_indexes_are_sequential() {
        let store = PunchGenerator::new(Some(1)).generate(16, 2);

        assert_eq!(store.len(), 16);
        assert_eq!(store.wire_size(), 16 * PUNCH_LEN);
        for (i, punch) in store.iter().enumerate() {
            assert_eq!(punch.serial(), Some(i as u32));
            assert_eq!(punch.store_index(), Some(i as u32));
            assert!(punch.station().unwrap() < 2);
        }
    }

    #[test]
    fn same_seed_same_stations() {
        let stations = |seed| -> Vec<u16> {
            PunchGenerator::new(Some(seed))
                .with_clock(fixed_time)
                .generate(64, 4)
                .iter()
                .map(|p| p.station().unwrap())
                .collect()
        };
        assert_eq!(stations(7), stations(7));
        assert!(stations(7).iter().any(|&s| s != stations(7)[0]));
    }

    #[test]
    fn clock_supplies_time_fields() {
        let store = PunchGenerator::new(Some(3))
            .with_clock(fixed_time)
            .generate(2, 1);

        let fields = store.get(1).unwrap().fields().unwrap();
        assert_eq!(fields.time, fixed_time());
        assert_eq!(fields.station, 0);
    }

    #[test]
    fn zero_stations_means_one() {
        let store = PunchGenerator::new(Some(5)).generate(8, 0);
        assert!(store.iter().all(|p| p.station() == Some(0)));
    }

    #[test]
    fn empty_level() {
        assert!(PunchGenerator::new(None).generate(0, 2).is_empty());
    }
}
