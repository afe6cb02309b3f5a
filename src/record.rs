//! Per-arm bookkeeping owned by the engine.

use std::fmt;

use rand::RngCore;

use crate::arm::Arm;
use crate::posterior::Posterior;
use crate::OnlineStats;

/// Stable arm identifier, assigned once by [`crate::Bandit::add_arm`].
///
/// Unlike a position, it never changes when arms are reordered by
/// (de)activation, and it is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmId(pub usize);

impl fmt::Display for ArmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One arm plus everything the engine derives from its rewards.
///
/// Read-only outside the engine. Derived fields (`posterior`, estimates,
/// `p_max`) are only guaranteed fresh when the record is obtained through
/// [`crate::Bandit::record`].
#[derive(Debug)]
pub struct ArmRecord {
    arm: Box<dyn Arm>,
    pub(crate) id: ArmId,
    pub(crate) active: bool,
    pub(crate) dirty: bool,
    pub(crate) num_pulls: u64,
    pub(crate) reward_stats: OnlineStats,
    pub(crate) rewards: Vec<f64>,
    pub(crate) posterior: Option<Box<dyn Posterior>>,
    pub(crate) estimated_mean: f64,
    pub(crate) estimated_variance: f64,
    pub(crate) p_max: f64,
}

impl ArmRecord {
    pub(crate) fn new(id: ArmId, arm: Box<dyn Arm>) -> Self {
        Self {
            arm,
            id,
            active: true,
            dirty: true,
            num_pulls: 0,
            reward_stats: OnlineStats::new(),
            rewards: Vec::new(),
            posterior: None,
            estimated_mean: f64::NAN,
            estimated_variance: f64::NAN,
            p_max: f64::NAN,
        }
    }

    /// Sample the arm and fold the reward into the raw statistics.
    pub(crate) fn pull(&mut self, rng: &mut dyn RngCore) -> f64 {
        let reward = self.arm.pull(rng);
        self.num_pulls += 1;
        self.reward_stats.push(reward);
        self.rewards.push(reward);
        self.dirty = true;
        reward
    }

    pub(crate) fn arm_mut(&mut self) -> &mut dyn Arm {
        self.arm.as_mut()
    }

    pub fn id(&self) -> ArmId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether derived state lags behind the raw rewards.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn num_pulls(&self) -> u64 {
        self.num_pulls
    }

    pub fn reward_stats(&self) -> &OnlineStats {
        &self.reward_stats
    }

    /// Every reward, oldest first.
    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    /// The backing arm, for identity and ground-truth queries.
    pub fn arm(&self) -> &dyn Arm {
        self.arm.as_ref()
    }

    pub fn identity(&self) -> String {
        self.arm.identity()
    }

    pub fn posterior(&self) -> Option<&dyn Posterior> {
        self.posterior.as_deref()
    }

    /// Point estimate used by policies; NaN while undefined.
    pub fn estimated_mean(&self) -> f64 {
        self.estimated_mean
    }

    /// Uncertainty estimate used by policies; NaN while undefined.
    pub fn estimated_variance(&self) -> f64 {
        self.estimated_variance
    }

    /// Probability of being the best arm; NaN unless freshly computed.
    pub fn p_max(&self) -> f64 {
        self.p_max
    }

    /// Snapshot suitable for logging.
    pub fn summary(&self) -> ArmSummary {
        ArmSummary {
            id: self.id,
            identity: self.identity(),
            active: self.active,
            num_pulls: self.num_pulls,
            estimated_mean: self.estimated_mean,
            estimated_variance: self.estimated_variance,
            p_max: self.p_max,
        }
    }
}

/// Log row describing one arm.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmSummary {
    pub id: ArmId,
    pub identity: String,
    pub active: bool,
    pub num_pulls: u64,
    pub estimated_mean: f64,
    pub estimated_variance: f64,
    pub p_max: f64,
}
