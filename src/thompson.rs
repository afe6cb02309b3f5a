//! Probability matching (Thompson sampling over the engine's posteriors).
//!
//! Each active arm gets one independent uniform draw `u`, mapped through its
//! posterior quantile function; the largest sample wins. An arm without a
//! posterior, or whose quantile is undefined, wins outright as soon as the
//! scan reaches it.
//!
//! Notes:
//! - This policy is **seedable** so selection can be reproducible in tests.
//! - Default construction uses a fixed seed (deterministic by default).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::decision::{Decision, DecisionPolicy, DecisionReason};
use crate::policy::Policy;
use crate::{Bandit, BanditError};

/// Configuration for [`ProbabilityMatching`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbabilityMatchingConfig {
    pub seed: u64,
}

/// Seedable probability-matching policy.
#[derive(Debug, Clone)]
pub struct ProbabilityMatching {
    rng: StdRng,
}

impl ProbabilityMatching {
    pub fn new(cfg: ProbabilityMatchingConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(cfg.seed),
        }
    }
}

impl Default for ProbabilityMatching {
    fn default() -> Self {
        Self::new(ProbabilityMatchingConfig::default())
    }
}

impl Policy for ProbabilityMatching {
    fn name(&self) -> &'static str {
        "probability_matching"
    }

    fn decide(&mut self, bandit: &mut Bandit) -> Result<Decision, BanditError> {
        let active = bandit.number_of_active_arms();
        if active == 0 {
            return Err(BanditError::NoActiveArms);
        }

        let mut best: Option<Decision> = None;
        let mut best_value = f64::NEG_INFINITY;
        for i in 0..active {
            let Some(record) = bandit.record(i) else {
                continue;
            };
            let id = record.id();
            let u: f64 = self.rng.random();
            let sample = record.posterior().map_or(f64::NAN, |p| p.quantile(u));
            if sample.is_nan() {
                return Ok(Decision {
                    policy: DecisionPolicy::ProbabilityMatching,
                    position: i,
                    id,
                    reason: DecisionReason::ForcedExploration,
                });
            }
            if best.is_none() || sample > best_value {
                best_value = sample;
                best = Some(Decision {
                    policy: DecisionPolicy::ProbabilityMatching,
                    position: i,
                    id,
                    reason: DecisionReason::PosteriorSample { value: sample },
                });
            }
        }
        best.ok_or(BanditError::NoActiveArms)
    }
}
