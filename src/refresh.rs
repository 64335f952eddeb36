use crate::policy::{ApprovalPolicy, LoanDecision};
use crate::regional::RegionalData;
use crate::scoring::{risk_score, RiskTier};
use crate::store::{Borrower, BorrowerStore, StoreError};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Periodic background task that re-reads every borrower and writes back a
/// fresh assessment against the current regional data.
///
/// The job is a second independent producer into the borrower store, next to
/// the request layer. Persistence is per-record atomic: each borrower gets
/// one UPDATE, so a failure on one record never blocks the rest of the
/// cycle, and a failed cycle never terminates the loop.
pub struct RefreshJob {
    store: BorrowerStore,
    policy: ApprovalPolicy,
    regional_source: PathBuf,
    interval: Duration,
}

/// Outcome counts for one pass over the table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Records whose derived fields were written back.
    pub updated: usize,
    /// Records without a base score, left untouched.
    pub skipped: usize,
    /// Records whose write-back failed; logged and carried past.
    pub failed: usize,
}

impl RefreshJob {
    pub fn new(
        store: BorrowerStore,
        policy: ApprovalPolicy,
        regional_source: PathBuf,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            policy,
            regional_source,
            interval,
        }
    }

    /// Run forever: one cycle, one sleep, repeat. Cycle errors are logged
    /// and swallowed; only process shutdown stops the task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "periodic score updater started");
            loop {
                info!("running periodic score update");
                match self.run_cycle() {
                    Ok(report) => info!(
                        updated = report.updated,
                        skipped = report.skipped,
                        failed = report.failed,
                        "score update completed"
                    ),
                    Err(err) => error!(%err, "score update cycle failed"),
                }
                tokio::time::sleep(self.interval).await;
            }
        })
    }

    /// One full pass: reload regional data (with the load-failure fallback),
    /// list every borrower, and write back recomputed derived fields.
    pub fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        let regional = RegionalData::load_or_builtin(&self.regional_source);
        let borrowers = self.store.list_all()?;
        Ok(self.refresh_borrowers(&regional, &borrowers))
    }

    /// Write back assessments for the given listing. Split from
    /// [`Self::run_cycle`] so the per-record continuation behavior can be
    /// exercised against a listing that races with concurrent deletes.
    pub fn refresh_borrowers(
        &self,
        regional: &RegionalData,
        borrowers: &[Borrower],
    ) -> CycleReport {
        let mut report = CycleReport::default();
        for borrower in borrowers {
            let Some(base_score) = borrower.base_score else {
                report.skipped += 1;
                continue;
            };
            let stats = regional.stats_or_default(&borrower.region);
            let score = risk_score(Some(base_score), &stats);
            let tier = RiskTier::classify(score);
            let decision = LoanDecision::derive(tier, &self.policy);

            match self
                .store
                .update_assessment(&borrower.id, score, tier, decision)
            {
                Ok(()) => report.updated += 1,
                Err(err) => {
                    warn!(borrower_id = %borrower.id, %err, "skipping borrower in refresh cycle");
                    report.failed += 1;
                }
            }
        }
        report
    }
}
