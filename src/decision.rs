//! Unified decision envelope for policy outputs.
//!
//! A per-step policy returns a [`Decision`] rather than a bare position so the
//! choice can be logged or replayed: it carries the stable [`ArmId`] alongside
//! the (unstable) position, and a typed reason for why that arm was chosen.

use crate::record::ArmId;

/// Which policy produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecisionPolicy {
    Random,
    UcbP,
    UcbV,
    ProbabilityMatching,
}

/// Why an arm was chosen.
///
/// Prefer adding new variants over changing existing semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecisionReason {
    /// The arm's score was undefined, so it was chosen to gather data
    /// (first such arm in scan order).
    ForcedExploration,

    /// Uniform draw over the active arms.
    UniformDraw,

    /// Largest `estimated_mean + confidence_gap`.
    UpperConfidenceBound { value: f64 },

    /// Largest draw from the per-arm posteriors.
    PosteriorSample { value: f64 },
}

/// A single policy decision in a unified envelope.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decision {
    /// The policy that produced this decision.
    pub policy: DecisionPolicy,
    /// Position of the chosen arm; valid until the next (de)activation.
    pub position: usize,
    /// Stable id of the chosen arm.
    pub id: ArmId,
    /// Why this choice happened.
    pub reason: DecisionReason,
}

impl Decision {
    /// Whether the arm was chosen only because nothing was known about it.
    pub fn is_forced(&self) -> bool {
        matches!(self.reason, DecisionReason::ForcedExploration)
    }

    /// The score that won, when the policy computes one.
    pub fn score(&self) -> Option<f64> {
        match self.reason {
            DecisionReason::UpperConfidenceBound { value }
            | DecisionReason::PosteriorSample { value } => Some(value),
            DecisionReason::ForcedExploration | DecisionReason::UniformDraw => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_only_for_scored_reasons() {
        let mut d = Decision {
            policy: DecisionPolicy::UcbP,
            position: 0,
            id: ArmId(4),
            reason: DecisionReason::UpperConfidenceBound { value: 1.25 },
        };
        assert_eq!(d.score(), Some(1.25));
        assert!(!d.is_forced());
        d.reason = DecisionReason::ForcedExploration;
        assert_eq!(d.score(), None);
        assert!(d.is_forced());
    }
}
