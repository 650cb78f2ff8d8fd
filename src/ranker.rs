//! Owner-side interpretation of decrypted distances.

use crate::config::{DISTANCE_THRESHOLD, PODIUM_SIZE};

use core::fmt;

/// Outcome of a single-candidate authentication.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Confirmed,
    NotConfirmed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => f.write_str("User Confirmed!"),
            Self::NotConfirmed => f.write_str("User not Confirmed!"),
        }
    }
}

/// A decrypted distance to one enrolled user.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub distance: f64,
}

impl Candidate {
    #[must_use]
    pub fn new(name: impl Into<String>, distance: f64) -> Self {
        Self {
            name: name.into(),
            distance,
        }
    }
}

/// Outcome of a multi-candidate recognition.
#[derive(Clone, Debug, PartialEq)]
pub enum Ranking {
    NoCandidates,
    /// Best match and at most `PODIUM_SIZE - 1` runners-up, closest first.
    Ranked {
        best: Candidate,
        runners_up: Vec<Candidate>,
    },
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidates => f.write_str("No users found"),
            Self::Ranked { best, runners_up } => {
                write!(
                    f,
                    "Most likely candidate is {} (distance: {})",
                    best.name, best.distance
                )?;
                if !runners_up.is_empty() {
                    f.write_str("\n  Other likely candidates:")?;
                    for candidate in runners_up {
                        write!(
                            f,
                            "\n   - {} (distance: {})",
                            candidate.name, candidate.distance
                        )?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Accepts, rejects and ranks decrypted distances against a fixed threshold.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ranker {
    threshold: f64,
}

impl Ranker {
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Accepts iff `distance < threshold`, a distance on the threshold is rejected.
    #[must_use]
    pub fn verdict(&self, distance: f64) -> Verdict {
        if distance < self.threshold {
            Verdict::Confirmed
        } else {
            Verdict::NotConfirmed
        }
    }

    /// Sorts candidates closest first and keeps the podium.
    ///
    /// The sort is stable, so ties keep their original order.
    #[must_use]
    pub fn rank(&self, mut candidates: Vec<Candidate>) -> Ranking {
        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        candidates.truncate(PODIUM_SIZE);

        let mut podium = candidates.into_iter();
        match podium.next() {
            None => Ranking::NoCandidates,
            Some(best) => Ranking::Ranked {
                best,
                runners_up: podium.collect(),
            },
        }
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(DISTANCE_THRESHOLD)
    }
}
