use crate::regional::RegionStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base score assumed when a borrower has no repayment history on file.
pub const DEFAULT_BASE_SCORE: f64 = 0.5;

/// Defaults for regional fields that are absent from a stats record. These
/// are deliberately different from the lookup-miss default in
/// [`crate::regional::RegionStats::lookup_default`].
pub const DEFAULT_UNEMPLOYMENT_RATE: f64 = 0.1;
pub const DEFAULT_AVG_INCOME: f64 = 200.0;

/// Heuristic risk score in [0, 1].
///
/// Higher unemployment pushes risk up, higher income pulls it down, and the
/// borrower's own prior dominates. The result is always clamped so that
/// unclamped values never reach the classifier.
pub fn risk_score(base_score: Option<f64>, stats: &RegionStats) -> f64 {
    let base = base_score.unwrap_or(DEFAULT_BASE_SCORE);
    let unemployment = stats
        .unemployment_rate
        .unwrap_or(DEFAULT_UNEMPLOYMENT_RATE);
    let income = stats.avg_income.unwrap_or(DEFAULT_AVG_INCOME);

    let adjusted = base + unemployment * 0.4 - income / 1000.0;
    adjusted.clamp(0.0, 1.0)
}

/// Discretization of the numeric risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Threshold map, left-closed/right-open: `[0, 0.4)` is low,
    /// `[0.4, 0.7)` medium, `[0.7, 1]` high.
    pub fn classify(score: f64) -> Self {
        if score < 0.4 {
            Self::Low
        } else if score < 0.7 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RiskTier {
    type Err = UnknownTier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown risk tier '{0}'")]
pub struct UnknownTier(pub String);
