//! Incremental reward statistics (Welford).

/// Running count, mean and sum of squared deviations.
///
/// Observations are folded in one at a time; there is no in-place reset.
/// Build a fresh accumulator instead (e.g. via `collect()`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OnlineStats {
    n: u64,
    mean: f64,
    m2: f64,
}

impl OnlineStats {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one observation.
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Number of observations.
    pub fn count(&self) -> u64 {
        self.n
    }

    /// Whether nothing has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Sample mean, or NaN when empty.
    pub fn mean(&self) -> f64 {
        if self.n > 0 {
            self.mean
        } else {
            f64::NAN
        }
    }

    /// Unbiased sample variance (`m2 / (n - 1)`, floored at 0), or NaN for fewer than 2 points.
    pub fn variance(&self) -> f64 {
        if self.n > 1 {
            (self.m2 / (self.n - 1) as f64).max(0.0)
        } else {
            f64::NAN
        }
    }

    /// Square root of [`variance`](Self::variance).
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl Extend<f64> for OnlineStats {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for x in iter {
            self.push(x);
        }
    }
}

impl FromIterator<f64> for OnlineStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut s = Self::new();
        s.extend(iter);
        s
    }
}
