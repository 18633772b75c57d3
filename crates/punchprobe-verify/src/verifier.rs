use std::collections::HashSet;

use punchprobe_frame::Punch;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VerifyError};
use crate::store::ReferenceStore;

/// How received punches are paired with reference punches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// The i-th received punch must equal the i-th transmitted punch.
    ///
    /// Only valid when a single ordering is guaranteed end to end, e.g. when
    /// every punch travels on the same channel.
    Positional,
    /// Each received punch is compared with the reference punch addressed by
    /// its serial id. Tolerates reordering between channels, but every serial
    /// must be seen exactly once.
    #[default]
    IdentifierKeyed,
}

impl MatchPolicy {
    pub fn name(self) -> &'static str {
        match self {
            MatchPolicy::Positional => "positional",
            MatchPolicy::IdentifierKeyed => "identifier-keyed",
        }
    }
}

/// Successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verified {
    /// Punches compared and found identical.
    pub matched: usize,
}

/// Reconcile `received` against `reference` under `policy`.
///
/// Both policies first require equal counts. Comparison stops at the first
/// mismatch.
pub fn verify(
    policy: MatchPolicy,
    received: &[Punch],
    reference: &ReferenceStore,
) -> Result<Verified> {
    if received.len() != reference.len() {
        return Err(VerifyError::CountMismatch {
            expected: reference.len(),
            received: received.len(),
        });
    }

    match policy {
        MatchPolicy::Positional => verify_positional(received, reference)?,
        MatchPolicy::IdentifierKeyed => verify_keyed(received, reference)?,
    }

    debug!(policy = policy.name(), matched = received.len(), "verified");
    Ok(Verified {
        matched: received.len(),
    })
}

fn verify_positional(received: &[Punch], reference: &ReferenceStore) -> Result<()> {
    for (index, (got, want)) in received.iter().zip(reference).enumerate() {
        if got != want {
            return Err(VerifyError::ContentMismatch {
                index,
                serial: got.serial(),
            });
        }
    }
    Ok(())
}

fn verify_keyed(received: &[Punch], reference: &ReferenceStore) -> Result<()> {
    let mut seen = HashSet::with_capacity(received.len());
    for (index, got) in received.iter().enumerate() {
        let serial = got.serial();
        let (serial, want) = serial
            .and_then(|serial| Some((serial, reference.by_serial(serial)?)))
            .ok_or(VerifyError::UnknownSerial { index, serial })?;
        if got != want {
            return Err(VerifyError::ContentMismatch {
                index,
                serial: Some(serial),
            });
        }
        if !seen.insert(serial) {
            return Err(VerifyError::DuplicateSerial { index, serial });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use punchprobe_frame::{PunchFields, PunchTime};

    use super::*;

    fn punch(serial: u32) -> Punch {
        Punch::encode(&PunchFields {
            station: (serial % 2) as u16,
            serial,
            store_index: serial,
            time: PunchTime {
                day_flags: 0x03,
                time_of_day: 1200 + serial as u16,
                sub_second: 0x40,
            },
        })
    }

    fn reference(n: u32) -> ReferenceStore {
        (0..n).map(punch).collect()
    }

    fn corrupt(p: &Punch, offset: usize) -> Punch {
        let mut raw = p.as_bytes().to_vec();
        raw[offset] ^= 0xFF;
        Punch::from_bytes(raw)
    }

    #[test]
    fn identical_sequences_pass_both_policies() {
        let store = reference(16);
        let received = store.as_slice().to_vec();

        for policy in [MatchPolicy::Positional, MatchPolicy::IdentifierKeyed] {
            assert_eq!(
                verify(policy, &received, &store),
                Ok(Verified { matched: 16 })
            );
        }
    }

    #[test]
    fn count_mismatch_reports_both_counts() {
        let store = reference(10);
        let received = store.as_slice()[..7].to_vec();

        for policy in [MatchPolicy::Positional, MatchPolicy::IdentifierKeyed] {
            assert_eq!(
                verify(policy, &received, &store),
                Err(VerifyError::CountMismatch {
                    expected: 10,
                    received: 7,
                })
            );
        }
    }

    #[test]
    fn positional_reports_first_differing_index() {
        let store = reference(12);
        let mut received = store.as_slice().to_vec();
        received[5] = corrupt(&received[5], 12);

        assert_eq!(
            verify(MatchPolicy::Positional, &received, &store),
            Err(VerifyError::ContentMismatch {
                index: 5,
                serial: Some(5),
            })
        );
    }

    #[test]
    fn positional_rejects_reordering() {
        let store = reference(4);
        let mut received = store.as_slice().to_vec();
        received.swap(1, 2);

        assert!(matches!(
            verify(MatchPolicy::Positional, &received, &store),
            Err(VerifyError::ContentMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn keyed_accepts_any_permutation() {
        let store = reference(9);
        let mut received = store.as_slice().to_vec();
        received.reverse();
        received.swap(0, 4);
        received.rotate_left(3);

        assert_eq!(
            verify(MatchPolicy::IdentifierKeyed, &received, &store),
            Ok(Verified { matched: 9 })
        );
    }

    #[test]
    fn keyed_rejects_duplicate_hiding_a_loss() {
        let store = reference(4);
        let mut received = store.as_slice().to_vec();
        // Serial 3 lost, serial 1 delivered twice: counts still agree.
        received[3] = received[1].clone();

        assert_eq!(
            verify(MatchPolicy::IdentifierKeyed, &received, &store),
            Err(VerifyError::DuplicateSerial {
                index: 3,
                serial: 1,
            })
        );
    }

    #[test]
    fn keyed_detects_payload_corruption() {
        let store = reference(6);
        let mut received = store.as_slice().to_vec();
        received.reverse();
        // Timer byte of the punch with serial 3.
        received[2] = corrupt(&received[2], 11);

        assert_eq!(
            verify(MatchPolicy::IdentifierKeyed, &received, &store),
            Err(VerifyError::ContentMismatch {
                index: 2,
                serial: Some(3),
            })
        );
    }

    #[test]
    fn keyed_corrupt_serial_is_verification_failure() {
        let store = reference(4);
        let mut received = store.as_slice().to_vec();
        // Serial 1 becomes 1 ^ 0xFF = 254, outside the reference range.
        received[1] = corrupt(&received[1], 8);

        assert_eq!(
            verify(MatchPolicy::IdentifierKeyed, &received, &store),
            Err(VerifyError::UnknownSerial {
                index: 1,
                serial: Some(254),
            })
        );
    }

    #[test]
    fn keyed_serial_pointing_at_other_slot_mismatches() {
        let store = reference(4);
        let mut raw = store.get(1).unwrap().as_bytes().to_vec();
        raw[8] = 2; // now claims serial 2
        let mut received = store.as_slice().to_vec();
        received[1] = Punch::from_bytes(raw);

        assert_eq!(
            verify(MatchPolicy::IdentifierKeyed, &received, &store),
            Err(VerifyError::ContentMismatch {
                index: 1,
                serial: Some(2),
            })
        );
    }

    #[test]
    fn keyed_short_frame_has_unknown_serial() {
        let store = reference(1);
        let received = vec![Punch::from_bytes(vec![0x02u8, 0xD3, 0x00, 0xAB, 0xCD])];

        assert_eq!(
            verify(MatchPolicy::IdentifierKeyed, &received, &store),
            Err(VerifyError::UnknownSerial {
                index: 0,
                serial: None,
            })
        );
    }

    #[test]
    fn empty_sets_verify() {
        let store = ReferenceStore::default();
        assert_eq!(
            verify(MatchPolicy::Positional, &[], &store),
            Ok(Verified { matched: 0 })
        );
    }

    #[test]
    fn policy_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&MatchPolicy::IdentifierKeyed).unwrap(),
            "\"identifier-keyed\""
        );
        assert_eq!(MatchPolicy::default(), MatchPolicy::IdentifierKeyed);
        assert_eq!(MatchPolicy::Positional.name(), "positional");
    }
}
