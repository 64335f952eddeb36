use crate::regional::RegionStats;
use crate::scoring::{RiskTier, DEFAULT_AVG_INCOME, DEFAULT_UNEMPLOYMENT_RATE};

/// Outcome of an explanation request.
///
/// The deterministic template is always computable; the external enhancement
/// is strictly additive. A failed enhancement is decided once per call and
/// folded into the returned text, never raised to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Explanation {
    /// Text produced by the external chat-completion call.
    Enhanced(String),
    /// Deterministic template, with the enhancement failure (if there was an
    /// enhancement to attempt at all) recorded alongside.
    Fallback {
        text: String,
        failure: Option<String>,
    },
}

impl Explanation {
    /// Render the text handed back to clients.
    pub fn content(&self) -> String {
        match self {
            Self::Enhanced(text) => text.clone(),
            Self::Fallback {
                text,
                failure: None,
            } => text.clone(),
            Self::Fallback {
                text,
                failure: Some(reason),
            } => format!("{text}\n\n(AI explanation unavailable: {reason})"),
        }
    }
}

/// Fixed-template summary of a scoring decision.
pub fn deterministic_explanation(
    name: &str,
    region: &str,
    score: f64,
    tier: RiskTier,
    stats: &RegionStats,
) -> String {
    let unemployment = stats
        .unemployment_rate
        .unwrap_or(DEFAULT_UNEMPLOYMENT_RATE);
    let income = stats.avg_income.unwrap_or(DEFAULT_AVG_INCOME);
    format!(
        "{name} from {region} was given a risk score of {score:.2}, classified as '{tier}'. \
         Regional unemployment is {:.2}%, with an average income of ${income}. \
         Adjustments were made based on these factors.",
        unemployment * 100.0
    )
}
