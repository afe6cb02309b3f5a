//! Unified `Policy` trait for arm-selection strategies.
//!
//! Policies never own arms: they read the engine's lazily refreshed records
//! through [`Bandit::record`] and pull through [`Bandit::pull_by_index`], so
//! every reward lands in the engine's bookkeeping.
//!
//! Per-step policies implement [`Policy::decide`]. Schedule-driven policies
//! (successive halving) reject it and override [`Policy::play_n_rounds`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::decision::{Decision, DecisionPolicy, DecisionReason};
use crate::{Bandit, BanditError};

/// Common interface for arm-selection strategies.
///
/// # Example
///
/// ```rust
/// use pullwise::{Bandit, NormalArm, Policy, RandomConfig, RandomPolicy};
///
/// let mut bandit = Bandit::with_seed(0);
/// bandit.add_arm(NormalArm::new(0.0, 1.0).unwrap()).unwrap();
/// bandit.add_arm(NormalArm::new(1.0, 1.0).unwrap()).unwrap();
///
/// let mut policy = RandomPolicy::new(RandomConfig::default());
/// policy.play_n_rounds(&mut bandit, 10).unwrap();
/// assert_eq!(bandit.number_of_pulls(), 10);
/// ```
pub trait Policy {
    /// Short name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Choose the next arm to pull without pulling it.
    fn decide(&mut self, bandit: &mut Bandit) -> Result<Decision, BanditError>;

    /// Position of the next arm to pull.
    fn select_next_arm(&mut self, bandit: &mut Bandit) -> Result<usize, BanditError> {
        self.decide(bandit).map(|d| d.position)
    }

    /// Run `n` rounds. For per-step policies a round is one select-then-pull.
    fn play_n_rounds(&mut self, bandit: &mut Bandit, n: usize) -> Result<(), BanditError> {
        for _ in 0..n {
            let i = self.select_next_arm(bandit)?;
            bandit.pull_by_index(i);
        }
        Ok(())
    }
}

/// Configuration for [`RandomPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RandomConfig {
    pub seed: u64,
}

/// Uniform choice among the active arms.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(cfg: RandomConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(cfg.seed),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new(RandomConfig::default())
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn decide(&mut self, bandit: &mut Bandit) -> Result<Decision, BanditError> {
        let n = bandit.number_of_active_arms();
        if n == 0 {
            return Err(BanditError::NoActiveArms);
        }
        let position = self.rng.random_range(0..n);
        let id = bandit
            .record(position)
            .map(|r| r.id())
            .ok_or(BanditError::NoActiveArms)?;
        Ok(Decision {
            policy: DecisionPolicy::Random,
            position,
            id,
            reason: DecisionReason::UniformDraw,
        })
    }
}
