use crate::explain::{deterministic_explanation, Explanation};
use crate::llm::{explanation_prompt, LlmClient};
use crate::policy::{ApprovalPolicy, LoanDecision};
use crate::regional::RegionalData;
use crate::scoring::{risk_score, RiskTier};
use crate::store::{Borrower, BorrowerStore, StoreError};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// Caller-supplied borrower fields; the repayment rate doubles as the base
/// score for the risk model.
#[derive(Debug, Clone, Deserialize)]
pub struct BorrowerDraft {
    pub name: String,
    pub region: String,
    pub loan_amount: f64,
    #[serde(default = "default_repayment_rate")]
    pub repayment_rate: f64,
}

fn default_repayment_rate() -> f64 {
    0.9
}

/// One full pass through the scoring pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub score: f64,
    pub tier: RiskTier,
    pub decision: LoanDecision,
}

/// Facade composing the regional data, scoring model, approval policy, and
/// borrower store. Request handlers and CLI commands go through this; the
/// refresh job composes the same pieces against its own regional snapshot.
pub struct AssessmentService {
    store: BorrowerStore,
    regional: RegionalData,
    policy: ApprovalPolicy,
    llm: Option<LlmClient>,
}

fn next_borrower_id() -> String {
    // Short ids keep the dashboard readable; collisions are unrealistic at
    // this data volume.
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

impl AssessmentService {
    pub fn new(
        store: BorrowerStore,
        regional: RegionalData,
        policy: ApprovalPolicy,
        llm: Option<LlmClient>,
    ) -> Self {
        Self {
            store,
            regional,
            policy,
            llm,
        }
    }

    /// Score, classify, and decide for one borrower against the regional
    /// snapshot this service was built with.
    pub fn assess(&self, base_score: Option<f64>, region: &str) -> Assessment {
        let stats = self.regional.stats_or_default(region);
        let score = risk_score(base_score, &stats);
        let tier = RiskTier::classify(score);
        let decision = LoanDecision::derive(tier, &self.policy);
        Assessment {
            score,
            tier,
            decision,
        }
    }

    /// Create a borrower with freshly computed derived fields.
    pub fn create(&self, draft: &BorrowerDraft) -> Result<(String, Assessment), StoreError> {
        let id = next_borrower_id();
        let assessment = self.assess(Some(draft.repayment_rate), &draft.region);
        self.store.insert(&Borrower {
            id: id.clone(),
            name: draft.name.clone(),
            region: draft.region.clone(),
            loan_amount: draft.loan_amount,
            base_score: Some(draft.repayment_rate),
            adjusted_score: Some(assessment.score),
            risk: Some(assessment.tier),
            decision: Some(assessment.decision),
        })?;
        Ok((id, assessment))
    }

    /// Overwrite an existing borrower and recompute the derived fields in
    /// the same single-statement write.
    pub fn update(&self, id: &str, draft: &BorrowerDraft) -> Result<Assessment, StoreError> {
        let assessment = self.assess(Some(draft.repayment_rate), &draft.region);
        self.store.update(&Borrower {
            id: id.to_string(),
            name: draft.name.clone(),
            region: draft.region.clone(),
            loan_amount: draft.loan_amount,
            base_score: Some(draft.repayment_rate),
            adjusted_score: Some(assessment.score),
            risk: Some(assessment.tier),
            decision: Some(assessment.decision),
        })?;
        Ok(assessment)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(id)
    }

    pub fn list(&self) -> Result<Vec<Borrower>, StoreError> {
        self.store.list_all()
    }

    /// Cheap liveness probe for the health endpoint.
    pub fn probe_store(&self) -> Result<i64, StoreError> {
        self.store.count()
    }

    /// Explain a scoring decision, enhancing through the chat-completion
    /// client when one is configured. Enhancement failure is recorded in the
    /// returned text, never surfaced as an error.
    pub async fn explain(&self, draft: &BorrowerDraft) -> Explanation {
        let stats = self.regional.stats_or_default(&draft.region);
        let score = risk_score(Some(draft.repayment_rate), &stats);
        let tier = RiskTier::classify(score);
        let fallback = deterministic_explanation(&draft.name, &draft.region, score, tier, &stats);

        let Some(client) = &self.llm else {
            return Explanation::Fallback {
                text: fallback,
                failure: None,
            };
        };

        let prompt = explanation_prompt(
            &draft.name,
            &draft.region,
            draft.loan_amount,
            draft.repayment_rate,
            &stats,
            score,
            tier,
        );
        match client.chat(&prompt).await {
            Ok(text) => Explanation::Enhanced(text),
            Err(err) => {
                warn!(%err, borrower = %draft.name, "explanation enhancement failed");
                Explanation::Fallback {
                    text: fallback,
                    failure: Some(err.to_string()),
                }
            }
        }
    }

    /// Apply per-borrower repayment feedback deltas to the stored base
    /// scores and re-assess each touched record, so the derived fields stay
    /// consistent with the formula. Returns the number of updated records.
    pub fn apply_repayment_feedback(
        &self,
        feedback: &HashMap<String, f64>,
    ) -> Result<usize, StoreError> {
        let mut updated = 0;
        for mut borrower in self.store.list_all()? {
            let Some(delta) = feedback.get(&borrower.id) else {
                continue;
            };
            let new_base = borrower.base_score.unwrap_or(0.0) + delta;
            let assessment = self.assess(Some(new_base), &borrower.region);
            borrower.base_score = Some(new_base);
            borrower.adjusted_score = Some(assessment.score);
            borrower.risk = Some(assessment.tier);
            borrower.decision = Some(assessment.decision);
            self.store.update(&borrower)?;
            updated += 1;
        }
        Ok(updated)
    }
}
