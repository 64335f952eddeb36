use crate::scoring::RiskTier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Static approval policy: which risk tiers are eligible for a loan.
///
/// Adjustable per deployment but never learned from data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    pub approve_low: bool,
    pub approve_medium: bool,
    pub approve_high: bool,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            approve_low: true,
            approve_medium: true,
            approve_high: false,
        }
    }
}

impl ApprovalPolicy {
    pub fn approves(&self, tier: RiskTier) -> bool {
        match tier {
            RiskTier::Low => self.approve_low,
            RiskTier::Medium => self.approve_medium,
            RiskTier::High => self.approve_high,
        }
    }

    /// Return a policy with one tier's eligibility overridden.
    pub fn with_tier(mut self, tier: RiskTier, approve: bool) -> Self {
        match tier {
            RiskTier::Low => self.approve_low = approve,
            RiskTier::Medium => self.approve_medium = approve,
            RiskTier::High => self.approve_high = approve,
        }
        self
    }
}

/// Outcome label attached to a borrower record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanDecision {
    Approved,
    Rejected,
    Conditional,
}

impl LoanDecision {
    /// Derive the decision from the tier under the given policy.
    ///
    /// Approved medium-tier loans are promoted to conditional approval; this
    /// is the only place two approvals diverge in outcome label.
    pub fn derive(tier: RiskTier, policy: &ApprovalPolicy) -> Self {
        if !policy.approves(tier) {
            Self::Rejected
        } else if tier == RiskTier::Medium {
            Self::Conditional
        } else {
            Self::Approved
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Conditional => "Conditional",
        }
    }
}

impl fmt::Display for LoanDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LoanDecision {
    type Err = UnknownDecision;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            "Conditional" => Ok(Self::Conditional),
            other => Err(UnknownDecision(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown loan decision '{0}'")]
pub struct UnknownDecision(pub String);

/// Audit record for a manual override of a policy decision.
///
/// Constructed for the caller to log or forward; nothing in this service
/// persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub borrower_id: String,
    pub override_to: bool,
    pub reason: String,
}

impl OverrideRecord {
    pub fn new(borrower_id: &str, current_approval: bool, reason: &str) -> Self {
        Self {
            borrower_id: borrower_id.to_string(),
            override_to: !current_approval,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_rejects_high_only() {
        let policy = ApprovalPolicy::default();
        assert!(policy.approves(RiskTier::Low));
        assert!(policy.approves(RiskTier::Medium));
        assert!(!policy.approves(RiskTier::High));
    }

    #[test]
    fn approved_low_stays_approved() {
        let decision = LoanDecision::derive(RiskTier::Low, &ApprovalPolicy::default());
        assert_eq!(decision, LoanDecision::Approved);
    }

    #[test]
    fn approved_medium_becomes_conditional() {
        let decision = LoanDecision::derive(RiskTier::Medium, &ApprovalPolicy::default());
        assert_eq!(decision, LoanDecision::Conditional);
    }

    #[test]
    fn high_tier_is_rejected_by_default() {
        let decision = LoanDecision::derive(RiskTier::High, &ApprovalPolicy::default());
        assert_eq!(decision, LoanDecision::Rejected);
    }

    #[test]
    fn tier_override_flips_eligibility() {
        let lenient = ApprovalPolicy::default().with_tier(RiskTier::High, true);
        assert_eq!(
            LoanDecision::derive(RiskTier::High, &lenient),
            LoanDecision::Approved
        );

        let strict = ApprovalPolicy::default().with_tier(RiskTier::Medium, false);
        assert_eq!(
            LoanDecision::derive(RiskTier::Medium, &strict),
            LoanDecision::Rejected
        );
    }

    #[test]
    fn override_record_inverts_current_approval() {
        let record = OverrideRecord::new("b-001", true, "field officer vouched");
        assert!(!record.override_to);
        assert_eq!(record.borrower_id, "b-001");
    }
}
