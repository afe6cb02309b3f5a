//! Upper-confidence-bound policies.
//!
//! Selection is `argmax(estimated_mean + gap)` over the active arms, scanned
//! in position order. The first arm whose score is undefined is returned at
//! once (forced exploration). Ties within [`TIEBREAK_EPS`] are broken by a
//! fresh random key per candidate, which approximates a uniform draw among
//! the tied arms without collecting them.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::decision::{Decision, DecisionPolicy, DecisionReason};
use crate::policy::Policy;
use crate::record::{ArmId, ArmRecord};
use crate::{Bandit, BanditError};

/// Absolute tolerance for treating two UCB values as tied.
pub const TIEBREAK_EPS: f64 = 1e-12;

/// Exploration bonus added to an arm's estimated mean.
pub trait ConfidenceGap {
    /// Policy tag recorded in decisions.
    const POLICY: DecisionPolicy;

    fn name(&self) -> &'static str;

    /// Gap for `record` after `total_pulls` pulls overall; NaN when undefined.
    fn confidence_gap(&self, record: &ArmRecord, total_pulls: u64) -> f64;
}

/// `sqrt(estimated_variance * p * ln N)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UcbPConfig {
    /// Exploration weight.
    pub p: f64,
    pub seed: u64,
}

impl Default for UcbPConfig {
    fn default() -> Self {
        Self { p: 1.0, seed: 0 }
    }
}

/// `sqrt(2 * estimated_variance * ln N) + b * ln N / n_i`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UcbVConfig {
    /// Bound on the reward range.
    pub b: f64,
    pub seed: u64,
}

impl Default for UcbVConfig {
    fn default() -> Self {
        Self { b: 1.0, seed: 0 }
    }
}

/// UCB with a variance-scaled bonus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UcbPGap {
    pub p: f64,
}

impl ConfidenceGap for UcbPGap {
    const POLICY: DecisionPolicy = DecisionPolicy::UcbP;

    fn name(&self) -> &'static str {
        "ucb_p"
    }

    fn confidence_gap(&self, record: &ArmRecord, total_pulls: u64) -> f64 {
        let ln_n = (total_pulls as f64).ln();
        (record.estimated_variance() * self.p * ln_n).sqrt()
    }
}

/// Variance-aware UCB (UCB-V).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UcbVGap {
    pub b: f64,
}

impl ConfidenceGap for UcbVGap {
    const POLICY: DecisionPolicy = DecisionPolicy::UcbV;

    fn name(&self) -> &'static str {
        "ucb_v"
    }

    fn confidence_gap(&self, record: &ArmRecord, total_pulls: u64) -> f64 {
        let ln_n = (total_pulls as f64).ln();
        let n_i = record.num_pulls() as f64;
        (2.0 * record.estimated_variance() * ln_n).sqrt() + self.b * ln_n / n_i
    }
}

/// UCB policy over an arbitrary [`ConfidenceGap`].
#[derive(Debug, Clone)]
pub struct Ucb<G> {
    gap: G,
    rng: StdRng,
}

/// `UCB_p` policy.
pub type UcbP = Ucb<UcbPGap>;
/// `UCB_V` policy.
pub type UcbV = Ucb<UcbVGap>;

impl<G: ConfidenceGap> Ucb<G> {
    pub fn with_gap(gap: G, seed: u64) -> Self {
        Self {
            gap,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn gap(&self) -> &G {
        &self.gap
    }
}

impl Ucb<UcbPGap> {
    pub fn new(cfg: UcbPConfig) -> Self {
        Self::with_gap(UcbPGap { p: cfg.p }, cfg.seed)
    }
}

impl Ucb<UcbVGap> {
    pub fn new(cfg: UcbVConfig) -> Self {
        Self::with_gap(UcbVGap { b: cfg.b }, cfg.seed)
    }
}

impl<G: ConfidenceGap> Policy for Ucb<G> {
    fn name(&self) -> &'static str {
        self.gap.name()
    }

    fn decide(&mut self, bandit: &mut Bandit) -> Result<Decision, BanditError> {
        let active = bandit.number_of_active_arms();
        if active == 0 {
            return Err(BanditError::NoActiveArms);
        }
        let total_pulls = bandit.number_of_pulls();

        // (position, id, value, tie key)
        let mut best: Option<(usize, ArmId, f64, f64)> = None;
        for i in 0..active {
            let Some(record) = bandit.record(i) else {
                continue;
            };
            let id = record.id();
            let gap = self.gap.confidence_gap(record, total_pulls);
            let value = record.estimated_mean() + gap;
            if value.is_nan() {
                return Ok(Decision {
                    policy: G::POLICY,
                    position: i,
                    id,
                    reason: DecisionReason::ForcedExploration,
                });
            }
            let key: f64 = self.rng.random();
            best = match best {
                None => Some((i, id, value, key)),
                Some(b) if value > b.2 + TIEBREAK_EPS => Some((i, id, value, key)),
                Some(b) if ties(value, b.2) && key > b.3 => {
                    Some((i, id, value, key))
                }
                keep => keep,
            };
        }

        let (position, id, value, _) = best.ok_or(BanditError::NoActiveArms)?;
        Ok(Decision {
            policy: G::POLICY,
            position,
            id,
            reason: DecisionReason::UpperConfidenceBound { value },
        })
    }
}

/// Equal within [`TIEBREAK_EPS`]; infinite bounds of the same sign tie too.
fn ties(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= TIEBREAK_EPS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::{BernoulliArm, DataArm};
    use crate::bandit::BanditConfig;
    use crate::estimator::Estimator;

    fn seq(values: &[f64]) -> DataArm {
        DataArm::sequential("d", values.to_vec()).unwrap()
    }

    #[test]
    fn undefined_gap_forces_first_arm_in_scan_order() {
        let mut b = Bandit::with_seed(0);
        b.add_arm(seq(&[0.0, 0.1])).unwrap();
        b.add_arm(seq(&[9.0, 9.1])).unwrap();
        let mut ucb = UcbP::new(UcbPConfig::default());
        let d = ucb.decide(&mut b).unwrap();
        assert_eq!(d.position, 0);
        assert!(d.is_forced());
    }

    #[test]
    fn picks_the_unexplored_arm_before_argmax() {
        let mut b = Bandit::with_seed(0);
        b.add_arm(seq(&[5.0, 5.2])).unwrap();
        b.add_arm(seq(&[0.0, 0.1])).unwrap();
        b.min_pull_arms(2);
        b.add_arm(seq(&[1.0])).unwrap();
        let mut ucb = UcbV::new(UcbVConfig::default());
        let d = ucb.decide(&mut b).unwrap();
        assert_eq!(d.position, 2);
        assert!(d.is_forced());
    }

    #[test]
    fn argmax_when_all_defined() {
        let mut b = Bandit::with_seed(0);
        b.add_arm(seq(&[0.0, 0.2])).unwrap();
        b.add_arm(seq(&[3.0, 3.2])).unwrap();
        b.add_arm(seq(&[1.0, 1.2])).unwrap();
        b.min_pull_arms(4);
        let mut ucb = UcbP::new(UcbPConfig { p: 1.0, seed: 1 });
        let d = ucb.decide(&mut b).unwrap();
        assert_eq!(d.position, 1);
        let v = d.score().unwrap();
        assert!(v > 3.1);
    }

    #[test]
    fn ties_are_broken_across_candidates() {
        let mut b = Bandit::with_seed(0);
        for _ in 0..4 {
            b.add_arm(seq(&[1.0, 2.0])).unwrap();
        }
        b.min_pull_arms(2);
        let mut ucb = UcbP::new(UcbPConfig { p: 1.0, seed: 42 });
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[ucb.select_next_arm(&mut b).unwrap()] = true;
        }
        assert!(seen.iter().all(|&s| s), "seen={seen:?}");
    }

    #[test]
    fn infinite_bounds_tie_at_random() {
        // Unpulled Bernoulli arms already have a posterior, so UCB-V's
        // `b ln N / 0` term makes their bound +inf.
        let mut b = Bandit::new(BanditConfig {
            seed: 0,
            estimator: Estimator::Posterior,
        });
        b.add_arm(BernoulliArm::new(0.5).unwrap()).unwrap();
        b.min_pull_arms(2);
        for _ in 0..4 {
            b.add_arm(BernoulliArm::new(0.5).unwrap()).unwrap();
        }
        let mut ucb = UcbV::new(UcbVConfig { b: 1.0, seed: 3 });
        let mut counts = [0usize; 5];
        for _ in 0..200 {
            let d = ucb.decide(&mut b).unwrap();
            assert!(!d.is_forced());
            assert_eq!(d.score(), Some(f64::INFINITY));
            counts[d.position] += 1;
        }
        assert_eq!(counts[0], 0, "pulled arm has a finite bound");
        assert!(counts[1..].iter().all(|&c| c > 0), "counts={counts:?}");
    }

    #[test]
    fn no_active_arms() {
        let mut b = Bandit::with_seed(0);
        let mut ucb = UcbV::new(UcbVConfig::default());
        assert_eq!(ucb.decide(&mut b), Err(BanditError::NoActiveArms));
    }
}
