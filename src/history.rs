use serde::{Deserialize, Serialize};

/// One loan outcome from a group-lending cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLoanRecord {
    pub borrower_id: String,
    pub repaid: bool,
}

/// Aggregate repayment signals for a lending group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupHistorySummary {
    pub total_loans: usize,
    pub successful_repayments: usize,
    pub default_rate: f64,
}

/// Summarize repayment rates and risk signals from group lending data.
pub fn summarize_group_history(records: &[GroupLoanRecord]) -> GroupHistorySummary {
    let total_loans = records.len();
    let successful_repayments = records.iter().filter(|record| record.repaid).count();
    let defaulted = total_loans - successful_repayments;
    let default_rate = if total_loans == 0 {
        0.0
    } else {
        defaulted as f64 / total_loans as f64
    };

    GroupHistorySummary {
        total_loans,
        successful_repayments,
        default_rate,
    }
}
