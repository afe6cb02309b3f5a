//! Reward sources.
//!
//! An [`Arm`] is owned by a [`crate::Bandit`] once added and is only ever
//! pulled through it, so every reward lands in the engine's bookkeeping.
//! Randomness always comes from the generator passed to [`Arm::pull`].

use std::fmt;

use rand::{Rng, RngCore};
use rand_distr::{Bernoulli, Distribution, Exp, Normal};

use crate::conjugate::{BetaPosterior, ExponentialMeanPosterior, NormalMeanPosterior};
use crate::posterior::Posterior;
use crate::{BanditError, OnlineStats};

/// A reward-generating source with an unknown true mean.
pub trait Arm: fmt::Debug + Send {
    /// Draw one reward.
    fn pull(&mut self, rng: &mut dyn RngCore) -> f64;

    /// Ground-truth mean, for external regret computation.
    fn real_mean(&self) -> f64;

    /// Ground-truth variance, for external regret computation.
    fn real_variance(&self) -> f64;

    /// Human-readable description, also used as a lookup key.
    fn identity(&self) -> String;

    /// Whether [`posterior`](Self::posterior) is implemented.
    fn has_posterior(&self) -> bool {
        false
    }

    /// Current posterior over the mean, or `None` while there is not enough data.
    fn posterior(&self) -> Result<Option<Box<dyn Posterior>>, BanditError> {
        Err(BanditError::unsupported("posteriors", self.identity()))
    }

    /// Teardown hook, called whenever the engine deactivates this arm.
    fn deactivate(&mut self) {}
}

/// Gaussian rewards.
#[derive(Debug, Clone)]
pub struct NormalArm {
    mean: f64,
    variance: f64,
    dist: Normal<f64>,
    observed: OnlineStats,
}

impl NormalArm {
    /// Fewest rewards before a Student-t posterior is offered.
    pub const MIN_POSTERIOR_PULLS: u64 = 4;

    pub fn new(mean: f64, variance: f64) -> Result<Self, BanditError> {
        if !mean.is_finite() {
            return Err(BanditError::invalid("mean", mean));
        }
        if !(variance.is_finite() && variance >= 0.0) {
            return Err(BanditError::invalid("variance", variance));
        }
        let dist = Normal::new(mean, variance.sqrt())
            .map_err(|_| BanditError::invalid("variance", variance))?;
        Ok(Self {
            mean,
            variance,
            dist,
            observed: OnlineStats::new(),
        })
    }
}

impl Arm for NormalArm {
    fn pull(&mut self, rng: &mut dyn RngCore) -> f64 {
        let x = self.dist.sample(rng);
        self.observed.push(x);
        x
    }

    fn real_mean(&self) -> f64 {
        self.mean
    }

    fn real_variance(&self) -> f64 {
        self.variance
    }

    fn identity(&self) -> String {
        format!("normal(mean={}, variance={})", self.mean, self.variance)
    }

    fn has_posterior(&self) -> bool {
        true
    }

    fn posterior(&self) -> Result<Option<Box<dyn Posterior>>, BanditError> {
        if self.observed.count() < Self::MIN_POSTERIOR_PULLS {
            return Ok(None);
        }
        Ok(Some(Box::new(NormalMeanPosterior::from_stats(self.observed))))
    }
}

/// 0/1 rewards with success probability `p`.
#[derive(Debug, Clone)]
pub struct BernoulliArm {
    p: f64,
    dist: Bernoulli,
    successes: u64,
    failures: u64,
}

impl BernoulliArm {
    pub fn new(p: f64) -> Result<Self, BanditError> {
        let dist = Bernoulli::new(p).map_err(|_| BanditError::invalid("p", p))?;
        Ok(Self {
            p,
            dist,
            successes: 0,
            failures: 0,
        })
    }
}

impl Arm for BernoulliArm {
    fn pull(&mut self, rng: &mut dyn RngCore) -> f64 {
        if self.dist.sample(rng) {
            self.successes += 1;
            1.0
        } else {
            self.failures += 1;
            0.0
        }
    }

    fn real_mean(&self) -> f64 {
        self.p
    }

    fn real_variance(&self) -> f64 {
        self.p * (1.0 - self.p)
    }

    fn identity(&self) -> String {
        format!("bernoulli(p={})", self.p)
    }

    fn has_posterior(&self) -> bool {
        true
    }

    fn posterior(&self) -> Result<Option<Box<dyn Posterior>>, BanditError> {
        Ok(Some(Box::new(BetaPosterior::from_counts(
            self.successes,
            self.failures,
        ))))
    }
}

/// Exponential rewards with rate `lambda` (mean `1 / lambda`).
#[derive(Debug, Clone)]
pub struct ExponentialArm {
    lambda: f64,
    dist: Exp<f64>,
    observed: OnlineStats,
}

impl ExponentialArm {
    pub fn new(lambda: f64) -> Result<Self, BanditError> {
        if !(lambda.is_finite() && lambda > 0.0) {
            return Err(BanditError::invalid("lambda", lambda));
        }
        let dist = Exp::new(lambda).map_err(|_| BanditError::invalid("lambda", lambda))?;
        Ok(Self {
            lambda,
            dist,
            observed: OnlineStats::new(),
        })
    }
}

impl Arm for ExponentialArm {
    fn pull(&mut self, rng: &mut dyn RngCore) -> f64 {
        let x = self.dist.sample(rng);
        self.observed.push(x);
        x
    }

    fn real_mean(&self) -> f64 {
        1.0 / self.lambda
    }

    fn real_variance(&self) -> f64 {
        1.0 / (self.lambda * self.lambda)
    }

    fn identity(&self) -> String {
        format!("exponential(lambda={})", self.lambda)
    }

    fn has_posterior(&self) -> bool {
        true
    }

    fn posterior(&self) -> Result<Option<Box<dyn Posterior>>, BanditError> {
        if self.observed.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(ExponentialMeanPosterior::from_stats(
            self.observed,
        ))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    Bootstrap,
    Sequential { last: Option<usize> },
}

/// Replays a recorded data set.
#[derive(Debug, Clone)]
pub struct DataArm {
    name: String,
    values: Vec<f64>,
    summary: OnlineStats,
    replay: Replay,
}

impl DataArm {
    /// Each pull draws a value uniformly at random (with replacement).
    pub fn bootstrap(name: impl Into<String>, values: Vec<f64>) -> Result<Self, BanditError> {
        Self::build(name.into(), values, Replay::Bootstrap)
    }

    /// Pulls walk the values in order, wrapping around at the end.
    pub fn sequential(name: impl Into<String>, values: Vec<f64>) -> Result<Self, BanditError> {
        Self::build(name.into(), values, Replay::Sequential { last: None })
    }

    fn build(name: String, values: Vec<f64>, replay: Replay) -> Result<Self, BanditError> {
        if values.is_empty() {
            return Err(BanditError::invalid("number of values", 0.0));
        }
        if let Some(bad) = values.iter().copied().find(|v| !v.is_finite()) {
            return Err(BanditError::invalid("value", bad));
        }
        let summary = values.iter().copied().collect();
        Ok(Self {
            name,
            values,
            summary,
            replay,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Arm for DataArm {
    fn pull(&mut self, rng: &mut dyn RngCore) -> f64 {
        let idx = match &mut self.replay {
            Replay::Bootstrap => rng.random_range(0..self.values.len()),
            Replay::Sequential { last } => {
                let next = last.map_or(0, |i| (i + 1) % self.values.len());
                *last = Some(next);
                next
            }
        };
        self.values[idx]
    }

    fn real_mean(&self) -> f64 {
        self.summary.mean()
    }

    fn real_variance(&self) -> f64 {
        self.summary.variance()
    }

    fn identity(&self) -> String {
        let mode = match self.replay {
            Replay::Bootstrap => "bootstrap",
            Replay::Sequential { .. } => "sequential",
        };
        format!("data({}, {mode}, n={})", self.name, self.values.len())
    }
}
