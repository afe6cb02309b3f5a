//! Successive halving.
//!
//! A fixed schedule rather than a per-step policy: each round pulls every
//! active arm `r` times, keeps the best `max(1, round(active / eta_arms))`
//! by estimated mean, and multiplies `r` by `eta_pulls`.

use tracing::debug;

use crate::decision::Decision;
use crate::policy::Policy;
use crate::{Bandit, BanditError};

/// Configuration for [`SuccessiveHalving`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuccessiveHalvingConfig {
    /// Pulls per arm in the first round. Empirical estimates need at least 2,
    /// otherwise the first cut ranks every arm as undefined.
    pub min_pulls_per_round: u64,
    /// Active set shrinks by this factor each round.
    pub eta_arms: f64,
    /// Pulls per arm grow by this factor each round.
    pub eta_pulls: f64,
}

impl Default for SuccessiveHalvingConfig {
    fn default() -> Self {
        Self {
            min_pulls_per_round: 2,
            eta_arms: 2.0,
            eta_pulls: 2.0,
        }
    }
}

/// Successive-halving schedule.
#[derive(Debug, Clone)]
pub struct SuccessiveHalving {
    cfg: SuccessiveHalvingConfig,
}

impl SuccessiveHalving {
    pub fn new(cfg: SuccessiveHalvingConfig) -> Result<Self, BanditError> {
        if !(cfg.eta_arms.is_finite() && cfg.eta_arms >= 1.0) {
            return Err(BanditError::invalid("eta_arms", cfg.eta_arms));
        }
        if !(cfg.eta_pulls.is_finite() && cfg.eta_pulls > 0.0) {
            return Err(BanditError::invalid("eta_pulls", cfg.eta_pulls));
        }
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &SuccessiveHalvingConfig {
        &self.cfg
    }

    /// How many arms survive a round that started with `active` arms.
    pub fn survivors(&self, active: usize) -> usize {
        let kept = (active as f64 / self.cfg.eta_arms).round() as usize;
        kept.clamp(1, active.max(1))
    }
}

impl Policy for SuccessiveHalving {
    fn name(&self) -> &'static str {
        "successive_halving"
    }

    /// Always fails: the schedule only runs through [`Policy::play_n_rounds`].
    fn decide(&mut self, _bandit: &mut Bandit) -> Result<Decision, BanditError> {
        Err(BanditError::unsupported("a single next arm", self.name()))
    }

    fn play_n_rounds(&mut self, bandit: &mut Bandit, n: usize) -> Result<(), BanditError> {
        let mut pulls_per_arm = self.cfg.min_pulls_per_round;
        for round in 0..n {
            let active = bandit.number_of_active_arms();
            if active == 0 {
                return Err(BanditError::NoActiveArms);
            }
            for i in 0..active {
                for _ in 0..pulls_per_arm {
                    bandit.pull_by_index(i);
                }
            }
            let keep = self.survivors(active);
            bandit.deactivate_n_worst(active - keep);
            debug!(round, active, keep, pulls_per_arm, "successive halving round");
            pulls_per_arm = (pulls_per_arm as f64 * self.cfg.eta_pulls) as u64;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::{DataArm, NormalArm};

    #[test]
    fn survivors_round_and_floor_at_one() {
        let sh = SuccessiveHalving::new(SuccessiveHalvingConfig::default()).unwrap();
        assert_eq!(sh.survivors(128), 64);
        assert_eq!(sh.survivors(3), 2);
        assert_eq!(sh.survivors(1), 1);
        let third = SuccessiveHalving::new(SuccessiveHalvingConfig {
            eta_arms: 3.0,
            ..SuccessiveHalvingConfig::default()
        })
        .unwrap();
        assert_eq!(third.survivors(10), 3);
        assert_eq!(third.survivors(1), 1);
    }

    #[test]
    fn rejects_shrinking_factors_below_one() {
        let bad = SuccessiveHalvingConfig {
            eta_arms: 0.5,
            ..SuccessiveHalvingConfig::default()
        };
        assert!(SuccessiveHalving::new(bad).is_err());
    }

    #[test]
    fn single_step_is_unsupported() {
        let mut b = Bandit::with_seed(0);
        b.add_arm(NormalArm::new(0.0, 1.0).unwrap()).unwrap();
        let mut sh = SuccessiveHalving::new(SuccessiveHalvingConfig::default()).unwrap();
        assert!(matches!(
            sh.select_next_arm(&mut b),
            Err(BanditError::Unsupported { .. })
        ));
    }

    #[test]
    fn total_pulls_follow_the_schedule() {
        let mut b = Bandit::with_seed(1);
        for i in 0..128 {
            b.add_arm(NormalArm::new(i as f64 / 128.0, 0.1).unwrap())
                .unwrap();
        }
        let mut sh = SuccessiveHalving::new(SuccessiveHalvingConfig {
            min_pulls_per_round: 16,
            eta_arms: 2.0,
            eta_pulls: 2.0,
        })
        .unwrap();
        sh.play_n_rounds(&mut b, 8).unwrap();
        // 128*16 + 64*32 + ... + 1*2048
        assert_eq!(b.number_of_pulls(), 16384);
        assert_eq!(b.number_of_active_arms(), 1);
    }

    #[test]
    fn default_first_round_ranks_by_mean() {
        let mut b = Bandit::with_seed(3);
        for m in [0.9, 0.1, 0.2, 0.3] {
            b.add_arm(DataArm::sequential("d", vec![m - 0.05, m + 0.05]).unwrap())
                .unwrap();
        }
        let mut sh = SuccessiveHalving::new(SuccessiveHalvingConfig::default()).unwrap();
        sh.play_n_rounds(&mut b, 1).unwrap();
        assert_eq!(b.number_of_active_arms(), 2);
        let kept: Vec<f64> = (0..2)
            .map(|i| b.record(i).unwrap().arm().real_mean())
            .collect();
        assert!((kept[0] - 0.9).abs() < 1e-12, "kept={kept:?}");
        assert!((kept[1] - 0.3).abs() < 1e-12, "kept={kept:?}");
    }

    #[test]
    fn keeps_the_best_data_arm() {
        let mut b = Bandit::with_seed(2);
        for m in [0.3, 0.1, 0.9, 0.5] {
            b.add_arm(DataArm::sequential("d", vec![m - 0.05, m + 0.05]).unwrap())
                .unwrap();
        }
        let mut sh = SuccessiveHalving::new(SuccessiveHalvingConfig {
            min_pulls_per_round: 2,
            ..SuccessiveHalvingConfig::default()
        })
        .unwrap();
        sh.play_n_rounds(&mut b, 2).unwrap();
        assert_eq!(b.number_of_active_arms(), 1);
        let winner = b.record(0).unwrap().arm().real_mean();
        assert!((winner - 0.9).abs() < 1e-12);
    }
}
