//! `pullwise`: a multi-armed bandit experimentation engine.
//!
//! Designed for offline and simulated experiments: you register reward
//! sources ("arms"), let a policy decide which one to pull next, and ask the
//! engine which arm is probably best. The engine owns the arms, so every
//! reward goes through its bookkeeping.
//!
//! **Core pieces:**
//! - [`Bandit`]: owns the arms, keeps active arms in a contiguous prefix,
//!   hands out stable [`ArmId`]s, and lazily recomputes per-arm estimates and
//!   posteriors through an [`Estimator`] (empirical, windowed, or the arm's own
//!   posterior).
//! - [`Posterior`]: belief over an arm's true mean. Every query returns NaN
//!   instead of failing when there is not enough data.
//! - p_max ([`Bandit::update_p_max`], [`compute_pmax`]): probability that each
//!   arm has the largest mean, by Gauss–Legendre integration over posteriors.
//! - Deactivation: by index or id, by confidence gap, by p_max threshold, or
//!   the `n` worst by estimated mean.
//!
//! **Selection policies** (all implement [`Policy`]):
//! - [`RandomPolicy`]: uniform over active arms.
//! - [`UcbP`] / [`UcbV`]: upper confidence bounds with forced exploration of
//!   arms whose bound is undefined.
//! - [`ProbabilityMatching`]: Thompson sampling via posterior quantiles.
//! - [`SuccessiveHalving`]: fixed-schedule elimination.
//!
//! **Arms:** [`NormalArm`], [`BernoulliArm`], [`ExponentialArm`] (each with a
//! conjugate posterior) and [`DataArm`] (replays recorded values).
//!
//! **Goals:**
//! - **Deterministic by default**: engines and stochastic policies own seeded
//!   generators; the same seeds give the same run.
//! - **Undefined is a value**: NaN estimates and missing posteriors steer
//!   policies toward exploration instead of surfacing as errors.
//!
//! **Non-goals:**
//! - No persistence, distributed execution, or real-time scheduling.
//! - Single-threaded use per engine; independent engines share nothing.
//!
//! # Example
//!
//! ```rust
//! use pullwise::{Bandit, NormalArm, Policy, UcbP, UcbPConfig};
//!
//! let mut bandit = Bandit::with_seed(7);
//! for mean in [0.2, 0.5, 0.9] {
//!     bandit.add_arm(NormalArm::new(mean, 0.1).unwrap()).unwrap();
//! }
//! bandit.min_pull_arms(2);
//!
//! let mut ucb = UcbP::new(UcbPConfig::default());
//! ucb.play_n_rounds(&mut bandit, 200).unwrap();
//!
//! bandit.update_p_max(false, 0.01, 64);
//! let total: f64 = (0..bandit.number_of_arms())
//!     .map(|i| bandit.record(i).unwrap().p_max())
//!     .sum();
//! assert!((total - 1.0).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]

mod error;
pub use error::*;

mod stats;
pub use stats::*;

mod posterior;
pub use posterior::*;

mod conjugate;
pub use conjugate::*;

mod arm;
pub use arm::*;

mod record;
pub use record::*;

mod estimator;
pub use estimator::*;

mod alloc;
pub use alloc::*;

mod pmax;
pub use pmax::*;

mod bandit;
pub use bandit::*;

mod decision;
pub use decision::*;

mod policy;
pub use policy::*;

mod ucb;
pub use ucb::*;

mod thompson;
pub use thompson::*;

mod halving;
pub use halving::*;
