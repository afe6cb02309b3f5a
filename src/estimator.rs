//! How an engine turns raw rewards into estimates and a posterior.

use tracing::warn;

use crate::posterior::gaussian_posterior;
use crate::record::ArmRecord;
use crate::OnlineStats;

/// Smallest variance-of-the-mean reported by the empirical estimators.
pub const MIN_ESTIMATED_VARIANCE: f64 = 1e-6;

/// Recompute strategy for dirty arm records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Estimator {
    /// Sample mean and variance of every reward, with a Gaussian posterior.
    #[default]
    Empirical,
    /// Like `Empirical`, restricted to the most recent `window` rewards.
    LastNPulls { window: usize },
    /// Delegate to the arm's own posterior.
    Posterior,
}

impl Estimator {
    /// Whether arms must implement [`crate::Arm::posterior`].
    pub fn requires_arm_posterior(&self) -> bool {
        matches!(self, Self::Posterior)
    }

    /// Recompute the derived fields of `record` and clear its dirty flag.
    pub(crate) fn refresh(&self, record: &mut ArmRecord) {
        match *self {
            Self::Empirical => {
                let stats = record.reward_stats;
                apply_empirical(record, &stats);
            }
            Self::LastNPulls { window } => {
                let window = window.max(2);
                let start = record.rewards.len().saturating_sub(window);
                let stats: OnlineStats = record.rewards[start..].iter().copied().collect();
                apply_empirical(record, &stats);
            }
            Self::Posterior => {
                let posterior = match record.arm().posterior() {
                    Ok(p) => p,
                    Err(err) => {
                        warn!(arm = %record.id, error = %err, "arm posterior unavailable");
                        None
                    }
                };
                let (mean, variance) = posterior
                    .as_deref()
                    .map_or((f64::NAN, f64::NAN), |p| (p.mean(), p.variance()));
                record.posterior = posterior;
                record.estimated_mean = mean;
                record.estimated_variance = variance;
            }
        }
        record.dirty = false;
    }
}

fn apply_empirical(record: &mut ArmRecord, stats: &OnlineStats) {
    if stats.count() < 2 {
        record.estimated_mean = f64::NAN;
        record.estimated_variance = f64::NAN;
        record.posterior = None;
        return;
    }
    let mean = stats.mean();
    let var_of_mean = stats.variance() / stats.count() as f64;
    record.estimated_mean = mean;
    record.estimated_variance = var_of_mean.max(MIN_ESTIMATED_VARIANCE);
    record.posterior = Some(Box::new(gaussian_posterior(
        mean,
        var_of_mean.max(f64::MIN_POSITIVE),
    )));
}
