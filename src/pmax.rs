//! Probability that each arm has the largest true mean ("p_max").
//!
//! For arm `i` with a defined posterior:
//!
//! ```text
//! p_i = ∫ pdf_i(x) · Π_{j ≠ i, defined} cdf_j(x) dx      over support_i(delta)
//! ```
//!
//! evaluated with fixed-order Gauss–Legendre quadrature, then scaled by the
//! share of arms whose posterior is defined. Arms without a posterior get
//! `1 / len`. The whole vector is normalized to sum to 1.

use tracing::warn;

use crate::alloc::normalize;
use crate::posterior::Posterior;

/// Integration settings for [`crate::Bandit::update_p_max_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PmaxConfig {
    /// Also integrate over inactive arms.
    pub include_inactive: bool,
    /// Each integral covers the `1 - delta` credible interval.
    pub delta: f64,
    /// Quadrature order.
    pub quadrature_points: usize,
}

impl Default for PmaxConfig {
    fn default() -> Self {
        Self {
            include_inactive: false,
            delta: 0.01,
            quadrature_points: 64,
        }
    }
}

/// Gauss–Legendre nodes and weights on `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Order-`n` rule (`n` is raised to at least 1).
    pub fn new(n: usize) -> Self {
        let n = n.max(1);
        let mut nodes = vec![0.0; n];
        let mut weights = vec![0.0; n];
        let nf = n as f64;
        for i in 0..n.div_ceil(2) {
            let mut z = (std::f64::consts::PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
            let mut dp = 1.0;
            for _ in 0..100 {
                // Legendre recurrence for P_n(z) and P_{n-1}(z).
                let (mut p1, mut p2) = (1.0, 0.0);
                for j in 0..n {
                    let jf = j as f64;
                    let p3 = p2;
                    p2 = p1;
                    p1 = ((2.0 * jf + 1.0) * z * p2 - jf * p3) / (jf + 1.0);
                }
                dp = nf * (z * p1 - p2) / (z * z - 1.0);
                let prev = z;
                z = prev - p1 / dp;
                if (z - prev).abs() < 1e-15 {
                    break;
                }
            }
            nodes[i] = -z;
            nodes[n - 1 - i] = z;
            let w = 2.0 / ((1.0 - z * z) * dp * dp);
            weights[i] = w;
            weights[n - 1 - i] = w;
        }
        Self { nodes, weights }
    }

    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    /// Approximate `∫_a^b f(x) dx`.
    pub fn integrate(&self, a: f64, b: f64, mut f: impl FnMut(f64) -> f64) -> f64 {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (a + b);
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| w * f(mid + half * x))
            .sum::<f64>()
            * half
    }
}

fn integration_window(posterior: &dyn Posterior, delta: f64) -> (f64, f64) {
    let (lo, hi) = posterior.support(delta);
    if lo.is_finite() && hi.is_finite() {
        return (lo, hi);
    }
    // Unbounded domain requested: integrate the central mass instead.
    posterior.support(1e-12)
}

fn is_usable(posterior: &dyn Posterior, delta: f64) -> bool {
    let (lo, hi) = integration_window(posterior, delta);
    lo.is_finite() && hi.is_finite() && hi >= lo
}

/// Unnormalized p_max of arm `index` among `posteriors`.
///
/// Every `Some` entry is assumed to be usable; see [`compute_pmax`].
pub fn pmax_raw(
    index: usize,
    posteriors: &[Option<&dyn Posterior>],
    delta: f64,
    rule: &GaussLegendre,
) -> f64 {
    let len = posteriors.len() as f64;
    let Some(target) = posteriors.get(index).copied().flatten() else {
        return 1.0 / len;
    };
    let undefined = posteriors.iter().filter(|p| p.is_none()).count() as f64;
    let (lo, hi) = integration_window(target, delta);
    if !(lo.is_finite() && hi.is_finite()) || hi < lo {
        return f64::NAN;
    }
    let others: Vec<&dyn Posterior> = posteriors
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != index)
        .filter_map(|(_, p)| *p)
        .collect();
    let integral = rule.integrate(lo, hi, |x| {
        others
            .iter()
            .fold(target.pdf(x), |acc, other| acc * other.cdf(x))
    });
    integral * (1.0 - undefined / len)
}

/// Normalized p_max for every entry of `posteriors`, aligned with the input.
///
/// `None` entries stand for arms without a posterior; posteriors whose credible
/// interval is undefined are treated the same way. Non-finite raw values are
/// treated as 0; if nothing positive remains the result is uniform.
pub fn compute_pmax(
    posteriors: &[Option<&dyn Posterior>],
    delta: f64,
    quadrature_points: usize,
) -> Vec<f64> {
    if posteriors.is_empty() {
        return Vec::new();
    }
    let usable: Vec<Option<&dyn Posterior>> = posteriors
        .iter()
        .map(|p| p.filter(|q| is_usable(*q, delta)))
        .collect();
    let rule = GaussLegendre::new(quadrature_points);
    let raw: Vec<f64> = (0..usable.len())
        .map(|i| pmax_raw(i, &usable, delta, &rule))
        .collect();
    let bad = raw.iter().filter(|v| !v.is_finite()).count();
    if bad > 0 {
        warn!(bad, total = raw.len(), "non-finite p_max integrals treated as zero");
    }
    normalize(&raw)
}
