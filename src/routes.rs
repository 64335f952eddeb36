use crate::assessment::{AssessmentService, BorrowerDraft};
use crate::dashboard::format_dashboard;
use crate::error::AppError;
use crate::policy::LoanDecision;
use crate::scoring::RiskTier;
use crate::store::Borrower;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shared request-layer state. The assessment service owns the store handle
/// and the regional snapshot loaded at startup.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<AssessmentService>,
    pub readiness: Arc<AtomicBool>,
}

/// Build the full application router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root_info))
        .route("/dashboard", get(dashboard_endpoint))
        .route("/health", get(health_endpoint))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .merge(borrower_routes())
        .with_state(state)
}

fn borrower_routes() -> Router<ApiState> {
    // Registered with and without the trailing slash to mirror the mounted
    // collection prefix the original service exposed.
    Router::new()
        .route("/api/borrowers", get(list_borrowers).post(add_borrower))
        .route("/api/borrowers/", get(list_borrowers).post(add_borrower))
        .route(
            "/api/borrowers/:borrower_id",
            put(update_borrower).delete(delete_borrower),
        )
        .route("/api/borrowers/explain/", post(explain_borrower))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExplainRequest {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) region: String,
    pub(crate) loan_amount: f64,
    #[serde(default = "default_repayment_rate")]
    pub(crate) repayment_rate: f64,
}

fn default_repayment_rate() -> f64 {
    0.9
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatedResponse {
    pub(crate) message: String,
    pub(crate) id: String,
    pub(crate) risk: RiskTier,
    pub(crate) decision: LoanDecision,
    pub(crate) score: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdatedResponse {
    pub(crate) message: String,
    pub(crate) risk: RiskTier,
    pub(crate) decision: LoanDecision,
    pub(crate) score: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) message: String,
}

/// Mirrors a common chat-completion response shape so existing frontends can
/// consume explanations unchanged.
#[derive(Debug, Serialize)]
pub(crate) struct ExplainResponse {
    pub(crate) choices: Vec<ExplainChoice>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExplainChoice {
    pub(crate) message: ExplainMessage,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExplainMessage {
    pub(crate) content: String,
}

pub(crate) async fn list_borrowers(
    State(state): State<ApiState>,
) -> Result<Json<Vec<Borrower>>, AppError> {
    let borrowers = state
        .service
        .list()
        .map_err(|err| AppError::store("listing borrowers", err))?;
    Ok(Json(borrowers))
}

pub(crate) async fn add_borrower(
    State(state): State<ApiState>,
    Json(draft): Json<BorrowerDraft>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let (id, assessment) = state
        .service
        .create(&draft)
        .map_err(|err| AppError::store("adding borrower", err))?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: format!("Borrower {} added successfully", draft.name),
            id,
            risk: assessment.tier,
            decision: assessment.decision,
            score: assessment.score,
        }),
    ))
}

pub(crate) async fn update_borrower(
    State(state): State<ApiState>,
    Path(borrower_id): Path<String>,
    Json(draft): Json<BorrowerDraft>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let assessment = state
        .service
        .update(&borrower_id, &draft)
        .map_err(|err| AppError::store("updating borrower", err))?;
    Ok(Json(UpdatedResponse {
        message: format!("Borrower {borrower_id} updated successfully"),
        risk: assessment.tier,
        decision: assessment.decision,
        score: assessment.score,
    }))
}

pub(crate) async fn delete_borrower(
    State(state): State<ApiState>,
    Path(borrower_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .service
        .delete(&borrower_id)
        .map_err(|err| AppError::store("deleting borrower", err))?;
    Ok(Json(MessageResponse {
        message: format!("Borrower {borrower_id} deleted successfully"),
    }))
}

pub(crate) async fn explain_borrower(
    State(state): State<ApiState>,
    Json(request): Json<ExplainRequest>,
) -> Json<ExplainResponse> {
    debug!(borrower_id = %request.id, "explaining risk assessment");
    let draft = BorrowerDraft {
        name: request.name,
        region: request.region,
        loan_amount: request.loan_amount,
        repayment_rate: request.repayment_rate,
    };
    let explanation = state.service.explain(&draft).await;
    Json(ExplainResponse {
        choices: vec![ExplainChoice {
            message: ExplainMessage {
                content: explanation.content(),
            },
        }],
    })
}

pub(crate) async fn root_info() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Microloan Risk Assessment Tool API",
        "status": "active",
        "endpoints": {
            "borrowers": "/api/borrowers",
            "dashboard": "/dashboard",
            "health": "/health",
        },
    }))
}

/// Render the console table as a side effect and report back.
pub(crate) async fn dashboard_endpoint(
    State(state): State<ApiState>,
) -> Result<Json<MessageResponse>, AppError> {
    let borrowers = state
        .service
        .list()
        .map_err(|err| AppError::store("rendering dashboard", err))?;
    println!("{}", format_dashboard(&borrowers));
    Ok(Json(MessageResponse {
        message: "Dashboard rendered in console".to_string(),
    }))
}

pub(crate) async fn health_endpoint(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let (status, database) = match state.service.probe_store() {
        Ok(_) => ("healthy", "connected".to_string()),
        Err(err) => ("degraded", format!("error: {err}")),
    };
    Json(json!({
        "status": status,
        "database": database,
        "intelligence_layer": "active",
        "application_layer": "active",
    }))
}

pub(crate) async fn readiness_endpoint(State(state): State<ApiState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(
    Extension(handle): Extension<Arc<PrometheusHandle>>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ApprovalPolicy;
    use crate::regional::RegionalData;
    use crate::store::BorrowerStore;

    fn state() -> ApiState {
        let service = AssessmentService::new(
            BorrowerStore::open_in_memory().expect("store opens"),
            RegionalData::builtin(),
            ApprovalPolicy::default(),
            None,
        );
        ApiState {
            service: Arc::new(service),
            readiness: Arc::new(AtomicBool::new(true)),
        }
    }

    fn draft(name: &str, region: &str, rate: f64) -> BorrowerDraft {
        BorrowerDraft {
            name: name.to_string(),
            region: region.to_string(),
            loan_amount: 500.0,
            repayment_rate: rate,
        }
    }

    #[tokio::test]
    async fn add_borrower_returns_assessment_fields() {
        let state = state();
        let (status, Json(body)) =
            add_borrower(State(state.clone()), Json(draft("Maria Johnson", "Montserrado", 0.9)))
                .await
                .expect("create succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.message, "Borrower Maria Johnson added successfully");
        assert_eq!(body.id.len(), 8);
        // 0.9 + 0.12*0.4 - 200/1000 = 0.748 -> High under default thresholds.
        assert_eq!(body.risk, RiskTier::High);
        assert_eq!(body.decision, LoanDecision::Rejected);
    }

    #[tokio::test]
    async fn update_unknown_borrower_is_an_error() {
        let state = state();
        let err = update_borrower(
            State(state),
            Path("ghost".to_string()),
            Json(draft("Nobody", "Bong", 0.5)),
        )
        .await
        .expect_err("must fail");
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn explain_endpoint_always_returns_one_choice() {
        let state = state();
        let Json(body) = explain_borrower(
            State(state),
            Json(ExplainRequest {
                id: "1".to_string(),
                name: "Sarah Williams".to_string(),
                region: "Nimba".to_string(),
                loan_amount: 300.0,
                repayment_rate: 0.9,
            }),
        )
        .await;

        assert_eq!(body.choices.len(), 1);
        let content = &body.choices[0].message.content;
        assert!(content.contains("Sarah Williams"));
        assert!(content.contains("15.00%"));
    }

    #[tokio::test]
    async fn health_reports_database_probe() {
        let state = state();
        let Json(body) = health_endpoint(State(state)).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
        assert_eq!(body["intelligence_layer"], "active");
    }
}
