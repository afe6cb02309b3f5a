//! Conjugate posteriors for the bundled reward families.
//!
//! Each one keeps its own sufficient statistics, so it can be built from a
//! batch of rewards and then updated one reward at a time. Unlike the generic
//! shapes in [`crate::posterior`], all three also define a predictive
//! distribution over the next reward.

use rand::{Rng, RngCore};
use rand_distr::Distribution as _;
use statrs::distribution::{Beta, InverseGamma, StudentsT};

use crate::posterior::{DistributionPosterior, Posterior, ScaledPosterior};
use crate::{BanditError, OnlineStats};

macro_rules! delegate_queries {
    ($field:ident) => {
        fn mean(&self) -> f64 {
            self.$field.mean()
        }
        fn variance(&self) -> f64 {
            self.$field.variance()
        }
        fn pdf(&self, x: f64) -> f64 {
            self.$field.pdf(x)
        }
        fn cdf(&self, x: f64) -> f64 {
            self.$field.cdf(x)
        }
        fn quantile(&self, p: f64) -> f64 {
            self.$field.quantile(p)
        }
        fn domain(&self) -> (f64, f64) {
            self.$field.domain()
        }
    };
}

/// `Beta(successes + 1, failures + 1)` over a Bernoulli success probability.
#[derive(Debug, Clone)]
pub struct BetaPosterior {
    successes: u64,
    failures: u64,
    fitted: DistributionPosterior<Beta>,
}

impl BetaPosterior {
    /// Uniform prior, no observations.
    pub fn new() -> Self {
        Self::from_counts(0, 0)
    }

    /// Posterior after `successes` ones and `failures` zeros.
    pub fn from_counts(successes: u64, failures: u64) -> Self {
        Self {
            successes,
            failures,
            fitted: DistributionPosterior::fit(Beta::new(
                successes as f64 + 1.0,
                failures as f64 + 1.0,
            )),
        }
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn refit(&mut self) {
        *self = Self::from_counts(self.successes, self.failures);
    }
}

impl Default for BetaPosterior {
    fn default() -> Self {
        Self::new()
    }
}

impl Posterior for BetaPosterior {
    delegate_queries!(fitted);

    /// Rewards below 0.5 count as failures.
    fn add_observation(&mut self, x: f64) -> Result<(), BanditError> {
        if x < 0.5 {
            self.failures += 1;
        } else {
            self.successes += 1;
        }
        self.refit();
        Ok(())
    }

    fn predictive_sample(&self, rng: &mut dyn RngCore) -> Result<f64, BanditError> {
        let n = (self.successes + self.failures) as f64;
        let p = (self.successes as f64 + 1.0) / (n + 2.0);
        let u: f64 = rng.random();
        Ok(if u < p { 1.0 } else { 0.0 })
    }

    fn kind(&self) -> &'static str {
        "beta posterior"
    }
}

/// Inverse-gamma posterior over the mean of exponential rewards.
///
/// Shape `n`, scale `n * sample_mean`; undefined until at least one positive
/// reward has been seen.
#[derive(Debug, Clone)]
pub struct ExponentialMeanPosterior {
    stats: OnlineStats,
    fitted: DistributionPosterior<InverseGamma>,
}

impl ExponentialMeanPosterior {
    /// No observations (undefined).
    pub fn new() -> Self {
        Self::from_stats(OnlineStats::new())
    }

    /// Fit to already accumulated reward statistics.
    pub fn from_stats(stats: OnlineStats) -> Self {
        let n = stats.count() as f64;
        let fitted = if stats.is_empty() {
            DistributionPosterior::new(None)
        } else {
            DistributionPosterior::fit(InverseGamma::new(n, n * stats.mean()))
        };
        Self { stats, fitted }
    }

    fn shape_and_scale(&self) -> (f64, f64) {
        let n = self.stats.count() as f64;
        (n, n * self.stats.mean())
    }
}

impl Default for ExponentialMeanPosterior {
    fn default() -> Self {
        Self::new()
    }
}

impl Posterior for ExponentialMeanPosterior {
    delegate_queries!(fitted);

    fn add_observation(&mut self, x: f64) -> Result<(), BanditError> {
        let mut stats = self.stats;
        stats.push(x);
        *self = Self::from_stats(stats);
        Ok(())
    }

    /// Lomax predictive: `(U^(-1/shape) - 1) * scale`.
    fn predictive_sample(&self, rng: &mut dyn RngCore) -> Result<f64, BanditError> {
        if !self.fitted.is_defined() {
            return Ok(f64::NAN);
        }
        let (shape, scale) = self.shape_and_scale();
        let u = 1.0 - rng.random::<f64>();
        Ok((u.powf(-1.0 / shape) - 1.0) * scale)
    }

    fn kind(&self) -> &'static str {
        "exponential mean posterior"
    }
}

/// Student-t posterior over the mean of normal rewards with unknown variance.
///
/// `n - 1` degrees of freedom, centered on the sample mean, scaled by
/// `sample_std / sqrt(n)`. Undefined for fewer than two rewards or zero spread.
#[derive(Debug, Clone)]
pub struct NormalMeanPosterior {
    stats: OnlineStats,
    fitted: ScaledPosterior<StudentsT>,
}

impl NormalMeanPosterior {
    /// No observations (undefined).
    pub fn new() -> Self {
        Self::from_stats(OnlineStats::new())
    }

    /// Fit to already accumulated reward statistics.
    pub fn from_stats(stats: OnlineStats) -> Self {
        let n = stats.count() as f64;
        let standard = if stats.count() >= 2 {
            StudentsT::new(0.0, 1.0, n - 1.0).ok()
        } else {
            None
        };
        let scale = stats.std_dev() / n.sqrt();
        Self {
            stats,
            fitted: ScaledPosterior::new(standard, stats.mean(), scale),
        }
    }

    /// Degrees of freedom of the fitted t distribution.
    pub fn degrees_of_freedom(&self) -> f64 {
        self.stats.count() as f64 - 1.0
    }
}

impl Default for NormalMeanPosterior {
    fn default() -> Self {
        Self::new()
    }
}

impl Posterior for NormalMeanPosterior {
    delegate_queries!(fitted);

    fn add_observation(&mut self, x: f64) -> Result<(), BanditError> {
        let mut stats = self.stats;
        stats.push(x);
        *self = Self::from_stats(stats);
        Ok(())
    }

    /// `mean + std * sqrt(1 + 1/n) * t_{n-1}`.
    fn predictive_sample(&self, rng: &mut dyn RngCore) -> Result<f64, BanditError> {
        if !self.fitted.is_defined() {
            return Ok(f64::NAN);
        }
        let n = self.stats.count() as f64;
        let t = rand_distr::StudentT::new(n - 1.0)
            .map_err(|_| BanditError::invalid("degrees of freedom", n - 1.0))?;
        let spread = self.stats.std_dev() * (1.0 + 1.0 / n).sqrt();
        Ok(self.stats.mean() + spread * t.sample(rng))
    }

    fn kind(&self) -> &'static str {
        "normal mean posterior"
    }
}
