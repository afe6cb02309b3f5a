//! Posteriors over an arm's unknown mean reward.
//!
//! Every query degrades to `f64::NAN` instead of failing when the fitted
//! distribution is outside its parameter domain (too few observations, zero
//! spread, ...). Policies and deactivation strategies read NaN as "not enough
//! information yet" and explore.
//!
//! Two reusable shapes are provided:
//! - [`DistributionPosterior`]: queries answered directly by a closed-form
//!   `statrs` distribution fitted to sufficient statistics.
//! - [`ScaledPosterior`]: a standard-form distribution viewed through the affine
//!   map `x = center + scale * z`.
//!
//! [`gaussian_posterior`] builds the Gaussian used by the empirical estimators.
//! Conjugate posteriors for the bundled arms live in [`crate::conjugate`].

use std::fmt;

use rand::RngCore;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use statrs::statistics::Distribution as Moments;

use crate::BanditError;

/// Belief about an arm's true mean, plus optional predictive capabilities.
pub trait Posterior: fmt::Debug + Send + Sync {
    /// Posterior mean of the arm's mean.
    fn mean(&self) -> f64;
    /// Posterior variance of the arm's mean.
    fn variance(&self) -> f64;
    /// Density at `x`.
    fn pdf(&self, x: f64) -> f64;
    /// Cumulative probability at `x`.
    fn cdf(&self, x: f64) -> f64;
    /// Inverse of [`cdf`](Self::cdf); NaN for `p` outside `[0, 1]`.
    fn quantile(&self, p: f64) -> f64;
    /// Full domain `(lower, upper)` of the distribution.
    fn domain(&self) -> (f64, f64);

    /// Credible interval holding `1 - delta` of the mass.
    ///
    /// Symmetric: `(quantile(delta / 2), quantile(1 - delta / 2))`. For `delta`
    /// outside `(0, 1)` the full [`domain`](Self::domain) is returned.
    fn support(&self, delta: f64) -> (f64, f64) {
        if !(delta > 0.0 && delta < 1.0) {
            return self.domain();
        }
        (self.quantile(delta / 2.0), self.quantile(1.0 - delta / 2.0))
    }

    /// Fold one more observation into the posterior (conjugate update).
    fn add_observation(&mut self, _x: f64) -> Result<(), BanditError> {
        Err(BanditError::unsupported("adding observations", self.kind()))
    }

    /// Draw one future reward from the predictive distribution.
    fn predictive_sample(&self, _rng: &mut dyn RngCore) -> Result<f64, BanditError> {
        Err(BanditError::unsupported("predictive sampling", self.kind()))
    }

    /// Short name used in error messages.
    fn kind(&self) -> &'static str {
        "posterior"
    }
}

/// Closed-form distributions usable as posterior shapes.
pub trait ClosedForm:
    Continuous<f64, f64> + ContinuousCDF<f64, f64> + Moments<f64> + fmt::Debug + Send + Sync
{
}

impl<D> ClosedForm for D where
    D: Continuous<f64, f64> + ContinuousCDF<f64, f64> + Moments<f64> + fmt::Debug + Send + Sync
{
}

/// Invert a cdf by bracketed bisection, seeded with the distribution's own estimate.
///
/// Some `statrs` distributions only offer a coarse generic inverse; this polishes
/// it to full precision. NaN for `p` outside `[0, 1]`.
pub(crate) fn solve_quantile<D: ContinuousCDF<f64, f64>>(dist: &D, p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    let (lower, upper) = (dist.min(), dist.max());
    if p == 0.0 {
        return lower;
    }
    if p == 1.0 {
        return upper;
    }

    let guess = dist.inverse_cdf(p);
    let guess = if guess.is_finite() {
        guess.clamp(lower, upper)
    } else if lower.is_finite() && upper.is_finite() {
        0.5 * (lower + upper)
    } else if lower.is_finite() {
        lower + 1.0
    } else if upper.is_finite() {
        upper - 1.0
    } else {
        0.0
    };

    if (dist.cdf(guess) - p).abs() <= 1e-13 {
        return guess;
    }

    let mut lo = guess;
    let mut step = guess.abs().max(1.0) * 1e-3;
    for _ in 0..128 {
        if lo <= lower || dist.cdf(lo) <= p {
            break;
        }
        lo = (lo - step).max(lower);
        step *= 2.0;
    }
    let mut hi = guess;
    step = guess.abs().max(1.0) * 1e-3;
    for _ in 0..128 {
        if hi >= upper || dist.cdf(hi) >= p {
            break;
        }
        hi = (hi + step).min(upper);
        step *= 2.0;
    }

    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if dist.cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Posterior answered directly by a fitted closed-form distribution.
///
/// Holds `None` when fitting failed; every query is then NaN.
#[derive(Debug, Clone)]
pub struct DistributionPosterior<D> {
    dist: Option<D>,
}

impl<D: ClosedForm> DistributionPosterior<D> {
    /// Wrap an already fitted distribution (or `None` for "undefined").
    pub fn new(dist: Option<D>) -> Self {
        Self { dist }
    }

    /// Wrap the result of a fallible `statrs` constructor; errors become "undefined".
    pub fn fit<E>(fitted: Result<D, E>) -> Self {
        Self { dist: fitted.ok() }
    }

    /// Whether a distribution is present.
    pub fn is_defined(&self) -> bool {
        self.dist.is_some()
    }

    /// The fitted distribution, if any.
    pub fn distribution(&self) -> Option<&D> {
        self.dist.as_ref()
    }
}

impl<D: ClosedForm> Posterior for DistributionPosterior<D> {
    fn mean(&self) -> f64 {
        self.dist.as_ref().and_then(|d| d.mean()).unwrap_or(f64::NAN)
    }

    fn variance(&self) -> f64 {
        self.dist.as_ref().and_then(|d| d.variance()).unwrap_or(f64::NAN)
    }

    fn pdf(&self, x: f64) -> f64 {
        match &self.dist {
            Some(d) if !x.is_nan() => d.pdf(x),
            _ => f64::NAN,
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        match &self.dist {
            Some(d) if !x.is_nan() => d.cdf(x),
            _ => f64::NAN,
        }
    }

    fn quantile(&self, p: f64) -> f64 {
        match &self.dist {
            Some(d) => solve_quantile(d, p),
            None => f64::NAN,
        }
    }

    fn domain(&self) -> (f64, f64) {
        match &self.dist {
            Some(d) => (d.min(), d.max()),
            None => (f64::NAN, f64::NAN),
        }
    }

    fn kind(&self) -> &'static str {
        "distribution posterior"
    }
}

/// Standard-form distribution rescaled through `x = center + scale * z`.
#[derive(Debug, Clone)]
pub struct ScaledPosterior<D> {
    standard: DistributionPosterior<D>,
    center: f64,
    scale: f64,
}

impl<D: ClosedForm> ScaledPosterior<D> {
    /// `standard` is the distribution of `z`; `scale` must be finite and positive
    /// for any query to be defined.
    pub fn new(standard: Option<D>, center: f64, scale: f64) -> Self {
        Self {
            standard: DistributionPosterior::new(standard),
            center,
            scale,
        }
    }

    /// Affine center.
    pub fn center(&self) -> f64 {
        self.center
    }

    /// Affine scale.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Whether all queries can be answered.
    pub fn is_defined(&self) -> bool {
        self.standard.is_defined()
            && self.center.is_finite()
            && self.scale.is_finite()
            && self.scale > 0.0
    }

    fn to_standard(&self, x: f64) -> f64 {
        (x - self.center) / self.scale
    }

    fn from_standard(&self, z: f64) -> f64 {
        z * self.scale + self.center
    }
}

impl<D: ClosedForm> Posterior for ScaledPosterior<D> {
    fn mean(&self) -> f64 {
        if !self.is_defined() {
            return f64::NAN;
        }
        self.from_standard(self.standard.mean())
    }

    fn variance(&self) -> f64 {
        if !self.is_defined() {
            return f64::NAN;
        }
        self.standard.variance() * self.scale * self.scale
    }

    fn pdf(&self, x: f64) -> f64 {
        if !self.is_defined() {
            return f64::NAN;
        }
        self.standard.pdf(self.to_standard(x)) / self.scale
    }

    fn cdf(&self, x: f64) -> f64 {
        if !self.is_defined() {
            return f64::NAN;
        }
        self.standard.cdf(self.to_standard(x))
    }

    fn quantile(&self, p: f64) -> f64 {
        if !self.is_defined() {
            return f64::NAN;
        }
        self.from_standard(self.standard.quantile(p))
    }

    fn domain(&self) -> (f64, f64) {
        if !self.is_defined() {
            return (f64::NAN, f64::NAN);
        }
        let (lo, hi) = self.standard.domain();
        (self.from_standard(lo), self.from_standard(hi))
    }

    fn kind(&self) -> &'static str {
        "scaled posterior"
    }
}

/// Gaussian posterior over the mean, from a `(mean, variance)` pair.
///
/// Undefined unless `mean` is finite and `variance` is finite and positive.
pub fn gaussian_posterior(mean: f64, variance: f64) -> DistributionPosterior<Normal> {
    if !(variance.is_finite() && variance > 0.0) {
        return DistributionPosterior::new(None);
    }
    DistributionPosterior::fit(Normal::new(mean, variance.sqrt()))
}
