//! Error types for pullwise.
//!
//! Only caller misuse is an error. Numerically undefined results (too few
//! observations, degenerate posteriors) are reported as `f64::NAN` or `None`
//! and never surface here.

use thiserror::Error;

/// Errors returned by arms, posteriors and policies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BanditError {
    /// The receiver does not implement the requested capability.
    #[error("{by} does not support {capability}")]
    Unsupported {
        /// What was asked for, e.g. `"predictive sampling"`.
        capability: &'static str,
        /// Who was asked (arm identity, posterior kind, policy name).
        by: String,
    },

    /// A per-step policy was asked to choose while no arm is active.
    #[error("no active arms to select from")]
    NoActiveArms,

    /// A constructor received a parameter outside its valid domain.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}

impl BanditError {
    pub(crate) fn unsupported(capability: &'static str, by: impl Into<String>) -> Self {
        Self::Unsupported {
            capability,
            by: by.into(),
        }
    }

    pub(crate) fn invalid(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter { name, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_message_names_both_sides() {
        let e = BanditError::unsupported("a single next arm", "successive halving");
        assert_eq!(
            e.to_string(),
            "successive halving does not support a single next arm"
        );
    }

    #[test]
    fn invalid_parameter_message() {
        let e = BanditError::invalid("variance", -1.0);
        assert_eq!(e.to_string(), "invalid parameter variance: -1");
    }
}
