//! The bandit engine: arm ownership, pulls, lazy refresh and deactivation.
//!
//! Records live in one vector kept partitioned so that active records occupy
//! the prefix `[0, number_of_active_arms())`. Positions shift whenever an arm
//! is (de)activated; [`ArmId`]s never do. Use positions for iteration within a
//! single call sequence and ids for anything long-lived.
//!
//! Derived state is recomputed lazily: a pull only marks its record dirty, and
//! the estimator runs when the record is next read through [`Bandit::record`]
//! (or before any operation that needs every estimate).

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use crate::arm::Arm;
use crate::estimator::Estimator;
use crate::pmax::{compute_pmax, PmaxConfig};
use crate::posterior::Posterior;
use crate::record::{ArmId, ArmRecord, ArmSummary};
use crate::BanditError;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BanditConfig {
    /// Seed for the generator handed to arms on every pull.
    pub seed: u64,
    /// How dirty records are recomputed.
    pub estimator: Estimator,
}

/// Owns a set of arms and everything derived from their rewards.
#[derive(Debug)]
pub struct Bandit {
    records: Vec<ArmRecord>,
    estimator: Estimator,
    rng: StdRng,
    num_active: usize,
    num_pulled_arms: usize,
    num_pulls: u64,
    num_dirty: usize,
    cumulative_reward: f64,
    p_max_stale: bool,
}

impl Default for Bandit {
    fn default() -> Self {
        Self::new(BanditConfig::default())
    }
}

impl Bandit {
    pub fn new(cfg: BanditConfig) -> Self {
        Self {
            records: Vec::new(),
            estimator: cfg.estimator,
            rng: StdRng::seed_from_u64(cfg.seed),
            num_active: 0,
            num_pulled_arms: 0,
            num_pulls: 0,
            num_dirty: 0,
            cumulative_reward: 0.0,
            p_max_stale: false,
        }
    }

    /// Empirical engine with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(BanditConfig {
            seed,
            ..BanditConfig::default()
        })
    }

    pub fn estimator(&self) -> Estimator {
        self.estimator
    }

    /// Add an arm; it starts active. Returns its stable id.
    ///
    /// The posterior-derived estimator rejects arms without a posterior.
    pub fn add_arm(&mut self, arm: impl Arm + 'static) -> Result<ArmId, BanditError> {
        self.add_boxed_arm(Box::new(arm))
    }

    pub fn add_boxed_arm(&mut self, arm: Box<dyn Arm>) -> Result<ArmId, BanditError> {
        if self.estimator.requires_arm_posterior() && !arm.has_posterior() {
            return Err(BanditError::unsupported("posteriors", arm.identity()));
        }
        let id = ArmId(self.records.len());
        debug!(arm = %id, identity = %arm.identity(), "adding arm");
        self.records.push(ArmRecord::new(id, arm));
        self.num_active += 1;
        self.num_dirty += 1;
        self.repartition();
        Ok(id)
    }

    pub fn number_of_arms(&self) -> usize {
        self.records.len()
    }

    pub fn number_of_active_arms(&self) -> usize {
        self.num_active
    }

    /// Successful pulls so far.
    pub fn number_of_pulls(&self) -> u64 {
        self.num_pulls
    }

    /// Arms pulled at least once.
    pub fn number_of_pulled_arms(&self) -> usize {
        self.num_pulled_arms
    }

    pub fn cumulative_reward(&self) -> f64 {
        self.cumulative_reward
    }

    /// Whether a pull happened since the last [`update_p_max`](Self::update_p_max).
    pub fn is_p_max_stale(&self) -> bool {
        self.p_max_stale
    }

    /// Current position of arm `id`.
    pub fn position_of(&self, id: ArmId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Pull the arm at position `i`. `None` if out of range or inactive.
    pub fn pull_by_index(&mut self, i: usize) -> Option<f64> {
        let record = self.records.get_mut(i)?;
        if !record.active {
            return None;
        }
        let first_pull = record.num_pulls == 0;
        let was_dirty = record.dirty;
        let reward = record.pull(&mut self.rng);
        trace!(arm = %record.id, reward, "pull");

        if first_pull {
            self.num_pulled_arms += 1;
        }
        if !was_dirty {
            self.num_dirty += 1;
        }
        self.num_pulls += 1;
        self.cumulative_reward += reward;
        self.p_max_stale = true;
        Some(reward)
    }

    /// Pull arm `id`. `None` if unknown or inactive.
    pub fn pull_by_identifier(&mut self, id: ArmId) -> Option<f64> {
        let i = self.position_of(id)?;
        self.pull_by_index(i)
    }

    /// Pull every active arm until it has at least `k` pulls.
    pub fn min_pull_arms(&mut self, k: u64) {
        for i in 0..self.num_active {
            while self.records[i].num_pulls < k {
                if self.pull_by_index(i).is_none() {
                    break;
                }
            }
        }
    }

    /// Fresh view of the record at position `i`.
    ///
    /// Recomputes derived state if the record is dirty; resets its p_max to NaN
    /// if pulls happened since the last p_max computation.
    pub fn record(&mut self, i: usize) -> Option<&ArmRecord> {
        if i >= self.records.len() {
            return None;
        }
        // Inactive records are not counted in `num_dirty`.
        if self.num_dirty > 0 || !self.records[i].active {
            self.refresh(i);
        }
        if self.p_max_stale {
            self.records[i].p_max = f64::NAN;
        }
        Some(&self.records[i])
    }

    pub fn record_by_identifier(&mut self, id: ArmId) -> Option<&ArmRecord> {
        let i = self.position_of(id)?;
        self.record(i)
    }

    /// All records without refreshing them.
    pub fn records(&self) -> &[ArmRecord] {
        &self.records
    }

    /// Refresh every record and return one log row per arm, in position order.
    pub fn summaries(&mut self) -> Vec<ArmSummary> {
        self.refresh_all();
        if self.p_max_stale {
            for r in &mut self.records {
                r.p_max = f64::NAN;
            }
        }
        self.records.iter().map(ArmRecord::summary).collect()
    }

    /// Recompute record `i` if dirty, keeping `num_dirty` equal to the number
    /// of active dirty records.
    fn refresh(&mut self, i: usize) {
        let record = &mut self.records[i];
        if !record.dirty {
            return;
        }
        let counted = record.active;
        self.estimator.refresh(record);
        if counted {
            self.num_dirty -= 1;
        }
    }

    fn refresh_all(&mut self) {
        for i in 0..self.records.len() {
            self.refresh(i);
        }
    }

    /// Recompute p_max for every considered arm.
    ///
    /// Expensive: refreshes all records and integrates over all considered
    /// posteriors. Arms outside the considered set get NaN.
    pub fn update_p_max(&mut self, include_inactive: bool, delta: f64, quadrature_points: usize) {
        self.refresh_all();
        for r in &mut self.records {
            r.p_max = f64::NAN;
        }
        let considered = if include_inactive {
            self.records.len()
        } else {
            self.num_active
        };
        let posteriors: Vec<Option<&dyn Posterior>> = self.records[..considered]
            .iter()
            .map(ArmRecord::posterior)
            .collect();
        let p = compute_pmax(&posteriors, delta, quadrature_points);
        for (record, value) in self.records.iter_mut().zip(p) {
            record.p_max = value;
        }
        self.p_max_stale = false;
        debug!(considered, delta, quadrature_points, "p_max updated");
    }

    pub fn update_p_max_with(&mut self, cfg: PmaxConfig) {
        self.update_p_max(cfg.include_inactive, cfg.delta, cfg.quadrature_points);
    }

    /// Deactivate the arm at position `i`. Returns whether anything changed.
    pub fn deactivate_by_index(&mut self, i: usize) -> bool {
        let Some(record) = self.records.get_mut(i) else {
            return false;
        };
        if !record.active {
            return false;
        }
        record.active = false;
        record.arm_mut().deactivate();
        if record.dirty {
            self.num_dirty -= 1;
        }
        debug!(arm = %record.id, "deactivated");
        self.num_active -= 1;
        let end = self.num_active + 1;
        self.records[i..end].sort_by_key(|r| !r.active);
        true
    }

    pub fn deactivate_by_identifier(&mut self, id: ArmId) -> bool {
        match self.position_of(id) {
            Some(i) => self.deactivate_by_index(i),
            None => false,
        }
    }

    /// Reactivate the arm at position `i`. Returns whether anything changed.
    pub fn reactivate_by_index(&mut self, i: usize) -> bool {
        let Some(record) = self.records.get_mut(i) else {
            return false;
        };
        if record.active {
            return false;
        }
        record.active = true;
        if record.dirty {
            self.num_dirty += 1;
        }
        debug!(arm = %record.id, "reactivated");
        self.num_active += 1;
        self.repartition();
        true
    }

    pub fn reactivate_by_identifier(&mut self, id: ArmId) -> bool {
        match self.position_of(id) {
            Some(i) => self.reactivate_by_index(i),
            None => false,
        }
    }

    /// Confidence-bound elimination.
    ///
    /// Deactivates every active arm whose upper credible bound at level `delta`
    /// lies below the best lower bound among active arms (and inactive ones too,
    /// if `include_inactive`). Arms without a posterior are left alone.
    pub fn deactivate_by_confidence_gap(&mut self, delta: f64, include_inactive: bool) -> usize {
        self.refresh_all();
        let considered = if include_inactive {
            self.records.len()
        } else {
            self.num_active
        };
        let mut best_lower = f64::NEG_INFINITY;
        let mut candidates: Vec<(ArmId, f64)> = Vec::new();
        for r in &self.records[..considered] {
            let Some(post) = r.posterior() else {
                continue;
            };
            let (lower, upper) = post.support(delta);
            if lower > best_lower {
                best_lower = lower;
            }
            if r.active && !upper.is_nan() {
                candidates.push((r.id, upper));
            }
        }
        let doomed: Vec<ArmId> = candidates
            .into_iter()
            .filter(|&(_, upper)| upper < best_lower)
            .map(|(id, _)| id)
            .collect();
        let removed = doomed
            .into_iter()
            .filter(|&id| self.deactivate_by_identifier(id))
            .count();
        debug!(removed, best_lower, delta, "confidence gap elimination");
        removed
    }

    /// Deactivate every active arm whose p_max is defined and below `threshold`.
    ///
    /// p_max is read through [`record`](Self::record), so after any pull it is
    /// undefined until [`update_p_max`](Self::update_p_max) runs again.
    pub fn deactivate_by_pmax_threshold(&mut self, threshold: f64) -> usize {
        let mut doomed = Vec::new();
        for i in 0..self.num_active {
            if let Some(r) = self.record(i) {
                if !r.p_max.is_nan() && r.p_max < threshold {
                    doomed.push(r.id);
                }
            }
        }
        let removed = doomed
            .into_iter()
            .filter(|&id| self.deactivate_by_identifier(id))
            .count();
        debug!(removed, threshold, "p_max elimination");
        removed
    }

    /// Deactivate the `n` active arms with the lowest estimated mean.
    ///
    /// Undefined means rank last. The surviving active prefix is left sorted
    /// by estimated mean, descending.
    pub fn deactivate_n_worst(&mut self, n: usize) -> usize {
        self.refresh_all();
        self.records[..self.num_active].sort_by(|a, b| {
            match (a.estimated_mean.is_nan(), b.estimated_mean.is_nan()) {
                (false, false) => b.estimated_mean.total_cmp(&a.estimated_mean),
                (a_nan, b_nan) => a_nan.cmp(&b_nan),
            }
        });
        let mut removed = 0;
        while removed < n && self.num_active > 0 {
            self.deactivate_by_index(self.num_active - 1);
            removed += 1;
        }
        debug!(removed, remaining = self.num_active, "deactivated worst arms");
        removed
    }

    fn repartition(&mut self) {
        self.records.sort_by_key(|r| !r.active);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::arm::{DataArm, NormalArm};

    fn data(values: &[f64]) -> DataArm {
        DataArm::sequential("d", values.to_vec()).unwrap()
    }

    fn dirty_active(b: &Bandit) -> usize {
        b.records.iter().filter(|r| r.active && r.dirty).count()
    }

    #[test]
    fn basic_counters() {
        let mut b = Bandit::with_seed(0);
        let a = b.add_arm(NormalArm::new(0.5, 0.2).unwrap()).unwrap();
        let c = b.add_arm(NormalArm::new(1.0, 0.3).unwrap()).unwrap();
        assert_eq!((a, c), (ArmId(0), ArmId(1)));
        assert_eq!(b.number_of_arms(), 2);
        assert_eq!(b.number_of_active_arms(), 2);
        assert_eq!(b.number_of_pulls(), 0);
        assert!(b.record(0).unwrap().estimated_mean().is_nan());
        assert!(b.record(1).unwrap().estimated_mean().is_nan());

        let r = b.pull_by_index(0).unwrap();
        let rec = b.record(0).unwrap();
        assert_eq!(rec.reward_stats().mean(), r);
        assert!(rec.estimated_variance().is_nan());
        assert_eq!(b.number_of_pulled_arms(), 1);

        b.min_pull_arms(10);
        assert_eq!(b.number_of_pulls(), 20);
        assert_eq!(b.number_of_pulled_arms(), 2);
        b.update_p_max(false, 0.01, 64);
        let total: f64 = (0..2).map(|i| b.record(i).unwrap().p_max()).sum();
        assert!((total - 1.0).abs() < 1e-9);
        b.deactivate_by_confidence_gap(0.01, false);
        assert!(b.number_of_active_arms() >= 1);
    }

    #[test]
    fn pulling_inactive_or_unknown_arms_changes_nothing() {
        let mut b = Bandit::with_seed(1);
        let id = b.add_arm(data(&[1.0])).unwrap();
        b.add_arm(data(&[2.0])).unwrap();
        assert!(b.deactivate_by_identifier(id));
        assert_eq!(b.pull_by_identifier(id), None);
        assert_eq!(b.pull_by_identifier(ArmId(7)), None);
        assert_eq!(b.pull_by_index(1), None);
        assert_eq!(b.pull_by_index(9), None);
        assert_eq!(b.number_of_pulls(), 0);
        assert_eq!(b.cumulative_reward(), 0.0);
        assert!(!b.is_p_max_stale());
    }

    #[test]
    fn deactivation_keeps_active_prefix_and_ids() {
        let mut b = Bandit::with_seed(2);
        let ids: Vec<ArmId> = (0..5)
            .map(|i| b.add_arm(data(&[i as f64])).unwrap())
            .collect();
        assert!(b.deactivate_by_index(1));
        assert!(!b.deactivate_by_index(4), "already inactive after move");
        assert_eq!(b.number_of_active_arms(), 4);
        assert!(b.records[..4].iter().all(|r| r.active));
        assert_eq!(b.records[4].id, ids[1]);
        for id in &ids {
            assert_eq!(b.records[b.position_of(*id).unwrap()].id, *id);
        }
        assert!(b.reactivate_by_identifier(ids[1]));
        assert!(!b.reactivate_by_identifier(ids[1]));
        assert!(b.records.iter().all(|r| r.active));
        assert_eq!(dirty_active(&b), b.num_dirty);
    }

    #[test]
    fn dirty_count_tracks_active_dirty_records() {
        let mut b = Bandit::with_seed(3);
        for v in [1.0, 2.0, 3.0] {
            b.add_arm(data(&[v, v + 1.0])).unwrap();
        }
        assert_eq!(b.num_dirty, 3);
        b.record(0);
        assert_eq!(b.num_dirty, 2);
        b.pull_by_index(0);
        assert_eq!(b.num_dirty, 3);
        b.deactivate_by_index(2);
        assert_eq!(b.num_dirty, dirty_active(&b));
        b.reactivate_by_index(2);
        assert_eq!(b.num_dirty, dirty_active(&b));
        b.summaries();
        assert_eq!(b.num_dirty, 0);
    }

    #[test]
    fn empirical_two_pulls() {
        let mut b = Bandit::with_seed(4);
        b.add_arm(data(&[0.3, 0.9])).unwrap();
        let r1 = b.pull_by_index(0).unwrap();
        let r2 = b.pull_by_index(0).unwrap();
        let rec = b.record(0).unwrap();
        let mean = (r1 + r2) / 2.0;
        assert!((rec.estimated_mean() - mean).abs() < 1e-12);
        let sample_var = (r1 - mean).powi(2) + (r2 - mean).powi(2);
        let post = rec.posterior().unwrap();
        assert!((post.mean() - mean).abs() < 1e-12);
        assert!((post.variance() - sample_var / 2.0).abs() < 1e-12);
    }

    #[test]
    fn n_worst_removes_lowest_means() {
        let mut b = Bandit::with_seed(5);
        let ids: Vec<ArmId> = [0.4, 0.9, 0.1, 0.7]
            .iter()
            .map(|&m| b.add_arm(data(&[m - 0.01, m + 0.01])).unwrap())
            .collect();
        b.add_arm(data(&[5.0])).unwrap();
        b.min_pull_arms(2);
        // one more arm that is never pulled: undefined mean, ranks last
        let fresh = b.add_arm(data(&[9.0])).unwrap();
        assert_eq!(b.deactivate_n_worst(3), 3);
        assert_eq!(b.number_of_active_arms(), 3);
        let alive: Vec<ArmId> = b.records[..3].iter().map(|r| r.id).collect();
        assert_eq!(alive, vec![ArmId(4), ids[1], ids[3]]);
        assert!(!b.records.iter().any(|r| r.id == fresh && r.active));
    }

    #[test]
    fn n_worst_stops_at_empty() {
        let mut b = Bandit::with_seed(6);
        b.add_arm(data(&[1.0])).unwrap();
        assert_eq!(b.deactivate_n_worst(5), 1);
        assert_eq!(b.number_of_active_arms(), 0);
    }

    #[test]
    fn pmax_threshold_skips_undefined() {
        let mut b = Bandit::with_seed(7);
        b.add_arm(data(&[0.0, 0.1])).unwrap();
        b.add_arm(data(&[5.0, 5.1])).unwrap();
        b.min_pull_arms(4);
        b.update_p_max(false, 0.01, 64);
        let late = b.add_arm(data(&[0.0])).unwrap();
        assert_eq!(b.deactivate_by_pmax_threshold(0.01), 1);
        assert_eq!(b.number_of_active_arms(), 2);
        assert!(b.records[..2].iter().any(|r| r.id == late));
    }

    #[test]
    fn pmax_threshold_ignores_stale_values() {
        let mut b = Bandit::with_seed(10);
        b.add_arm(data(&[0.0, 0.1])).unwrap();
        b.add_arm(data(&[5.0, 5.1])).unwrap();
        b.min_pull_arms(4);
        b.update_p_max(false, 0.01, 64);
        b.pull_by_index(1);
        assert_eq!(b.deactivate_by_pmax_threshold(0.01), 0);
        assert_eq!(b.number_of_active_arms(), 2);
    }

    #[test]
    fn pmax_goes_stale_on_pull() {
        let mut b = Bandit::with_seed(8);
        b.add_arm(data(&[0.0, 1.0])).unwrap();
        b.add_arm(data(&[0.5, 1.5])).unwrap();
        b.min_pull_arms(2);
        b.update_p_max(false, 0.01, 32);
        assert!(!b.is_p_max_stale());
        assert!(b.record(1).unwrap().p_max().is_finite());
        b.pull_by_index(0);
        assert!(b.is_p_max_stale());
        assert!(b.record(1).unwrap().p_max().is_nan());
    }

    #[test]
    fn confidence_gap_prunes_clearly_worse_arm() {
        let mut b = Bandit::with_seed(9);
        let good = b.add_arm(data(&[10.0, 10.2, 9.8])).unwrap();
        let bad = b.add_arm(data(&[0.0, 0.2, -0.2])).unwrap();
        b.min_pull_arms(30);
        assert_eq!(b.deactivate_by_confidence_gap(0.01, false), 1);
        assert_eq!(b.record(0).unwrap().id(), good);
        let pos = b.position_of(bad).unwrap();
        assert!(!b.records[pos].active);
    }

    #[test]
    fn confidence_gap_counts_inactive_lower_bounds() {
        let mut b = Bandit::with_seed(11);
        let good = b.add_arm(data(&[10.0, 10.2, 9.8])).unwrap();
        let bad = b.add_arm(data(&[0.0, 0.2, -0.2])).unwrap();
        b.min_pull_arms(30);
        assert!(b.deactivate_by_identifier(good));

        assert_eq!(b.deactivate_by_confidence_gap(0.01, false), 0);
        assert_eq!(b.number_of_active_arms(), 1);

        assert_eq!(b.deactivate_by_confidence_gap(0.01, true), 1);
        assert_eq!(b.number_of_active_arms(), 0);
        let pos = b.position_of(bad).unwrap();
        assert!(!b.records[pos].active);
    }

    #[derive(Debug)]
    struct CountingArm {
        values: Vec<f64>,
        next: usize,
        teardowns: Arc<AtomicUsize>,
    }

    impl Arm for CountingArm {
        fn pull(&mut self, _rng: &mut dyn rand::RngCore) -> f64 {
            let v = self.values[self.next % self.values.len()];
            self.next += 1;
            v
        }

        fn real_mean(&self) -> f64 {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        }

        fn real_variance(&self) -> f64 {
            0.0
        }

        fn identity(&self) -> String {
            format!("counting({})", self.real_mean())
        }

        fn deactivate(&mut self) {
            self.teardowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn teardown_hook_runs_once_per_deactivation() {
        let teardowns = Arc::new(AtomicUsize::new(0));
        let mut b = Bandit::with_seed(12);
        let ids: Vec<ArmId> = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|&m| {
                b.add_arm(CountingArm {
                    values: vec![m - 0.1, m + 0.1],
                    next: 0,
                    teardowns: Arc::clone(&teardowns),
                })
                .unwrap()
            })
            .collect();
        b.min_pull_arms(2);

        assert_eq!(b.deactivate_n_worst(2), 2);
        assert_eq!(teardowns.load(Ordering::SeqCst), 2);

        assert!(!b.deactivate_by_identifier(ids[0]));
        assert_eq!(teardowns.load(Ordering::SeqCst), 2);

        assert!(b.deactivate_by_identifier(ids[3]));
        assert_eq!(teardowns.load(Ordering::SeqCst), 3);

        assert!(b.reactivate_by_identifier(ids[3]));
        assert_eq!(teardowns.load(Ordering::SeqCst), 3);
        assert!(b.deactivate_by_index(0));
        assert_eq!(teardowns.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn posterior_estimator_rejects_plain_arms() {
        let mut b = Bandit::new(BanditConfig {
            seed: 0,
            estimator: Estimator::Posterior,
        });
        assert!(matches!(
            b.add_arm(data(&[1.0])),
            Err(BanditError::Unsupported { .. })
        ));
        assert!(b.add_arm(NormalArm::new(0.0, 1.0).unwrap()).is_ok());
        assert_eq!(b.number_of_arms(), 1);
    }
}
