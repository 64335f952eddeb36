//! Microloan risk assessment service.
//!
//! Stores borrower records in SQLite, scores them against regional economic
//! data, applies a static approval policy, and recomputes stored scores on a
//! fixed interval in the background. Exposed over an axum JSON API and a
//! small CLI.

pub mod assessment;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod explain;
pub mod history;
pub mod import;
pub mod llm;
pub mod policy;
pub mod refresh;
pub mod regional;
pub mod routes;
pub mod scoring;
pub mod store;
pub mod telemetry;

pub use assessment::{Assessment, AssessmentService, BorrowerDraft};
pub use error::AppError;
pub use policy::{ApprovalPolicy, LoanDecision, OverrideRecord};
pub use regional::{RegionStats, RegionalData};
pub use scoring::{risk_score, RiskTier};
pub use store::{Borrower, BorrowerStore, StoreError};
