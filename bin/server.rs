// Pension Contribution Engine - REST API server
// Carries the library operations over HTTP. Every response uses the same
// envelope: success flag, stable code, human-readable message, optional data.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use pension_engine::{
    add_monthly, add_voluntary, build_statement, check_eligibility, contributions_by_member,
    run_eligibility_job, run_failed_transaction_job, run_validation_job, setup_database,
    Contribution, ContributionStatement, EligibilityResult, EngineError, ErrorKind, JobReport,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API response envelope
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(message: &str, data: T) -> Self {
        Self {
            success: true,
            code: "OK".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }

    fn err(e: &EngineError) -> Self {
        Self {
            success: false,
            code: e.code().to_string(),
            message: e.to_string(),
            data: None,
        }
    }
}

fn status_for(e: &EngineError) -> StatusCode {
    match e.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response<T: Serialize>(e: EngineError) -> axum::response::Response {
    if e.kind() == ErrorKind::Persistence {
        error!(error = %e, "storage failure");
    }
    (status_for(&e), Json(ApiResponse::<T>::err(&e))).into_response()
}

#[derive(Deserialize)]
struct ContributionRequest {
    member_id: String,
    amount: f64,
    contribution_date: NaiveDate,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK", pension_engine::VERSION))
}

/// POST /api/contributions/monthly - Record a monthly contribution
async fn post_monthly(
    State(state): State<AppState>,
    Json(req): Json<ContributionRequest>,
) -> impl IntoResponse {
    let mut conn = state.db.lock().unwrap();

    match add_monthly(&mut conn, &req.member_id, req.amount, req.contribution_date) {
        Ok(contribution) => (
            StatusCode::OK,
            Json(ApiResponse::ok(
                "Monthly contribution added successfully.",
                contribution,
            )),
        )
            .into_response(),
        Err(e) => error_response::<Contribution>(e),
    }
}

/// POST /api/contributions/voluntary - Record a voluntary contribution
async fn post_voluntary(
    State(state): State<AppState>,
    Json(req): Json<ContributionRequest>,
) -> impl IntoResponse {
    let mut conn = state.db.lock().unwrap();

    match add_voluntary(&mut conn, &req.member_id, req.amount, req.contribution_date) {
        Ok(contribution) => (
            StatusCode::OK,
            Json(ApiResponse::ok(
                "Voluntary contribution added successfully.",
                contribution,
            )),
        )
            .into_response(),
        Err(e) => error_response::<Contribution>(e),
    }
}

/// GET /api/members/:id/contributions - Raw contribution list
async fn get_contributions(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match contributions_by_member(&conn, &member_id) {
        Ok(contributions) if contributions.is_empty() => {
            error_response::<Vec<Contribution>>(EngineError::NoContributions { member_id })
        }
        Ok(contributions) => (
            StatusCode::OK,
            Json(ApiResponse::ok(
                "Contributions retrieved successfully.",
                contributions,
            )),
        )
            .into_response(),
        Err(e) => error_response::<Vec<Contribution>>(e),
    }
}

/// GET /api/members/:id/statement - Contribution statement
async fn get_statement(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match build_statement(&conn, &member_id) {
        Ok(statement) => (
            StatusCode::OK,
            Json(ApiResponse::ok(
                "Contribution statement retrieved successfully.",
                statement,
            )),
        )
            .into_response(),
        Err(e) => error_response::<ContributionStatement>(e),
    }
}

/// GET /api/members/:id/eligibility - Benefit eligibility decision
/// Not eligible is a successful response, distinct from the 404 returned
/// when the member has no contributions at all.
async fn get_eligibility(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match check_eligibility(&conn, &member_id) {
        Ok(result) => {
            let message = if result.is_eligible {
                "Member is eligible for benefits."
            } else {
                "Member is not eligible for benefits."
            };
            (StatusCode::OK, Json(ApiResponse::ok(message, result))).into_response()
        }
        Err(e) => error_response::<EligibilityResult>(e),
    }
}

// ============================================================================
// Job Triggers
// ============================================================================

// Fire-and-forget: the caller gets an acknowledgement only; outcomes are
// observable through logs and subsequent state queries.
fn trigger_job<F>(state: AppState, name: &'static str, job: F) -> axum::response::Response
where
    F: Fn(&Connection) -> Result<JobReport, EngineError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let conn = state.db.lock().unwrap();
        match job(&conn) {
            Ok(report) => info!("{}", report.summary()),
            Err(e) => error!(job = name, error = %e, "job run failed"),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::ok("Job triggered.", name)),
    )
        .into_response()
}

/// POST /api/jobs/validation
async fn post_validation_job(State(state): State<AppState>) -> impl IntoResponse {
    trigger_job(state, "validate-contributions", run_validation_job)
}

/// POST /api/jobs/eligibility
async fn post_eligibility_job(State(state): State<AppState>) -> impl IntoResponse {
    trigger_job(state, "benefit-eligibility", run_eligibility_job)
}

/// POST /api/jobs/failed-transactions
async fn post_failed_transaction_job(State(state): State<AppState>) -> impl IntoResponse {
    trigger_job(state, "failed-transactions", run_failed_transaction_job)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pension_engine=info,pension_server=info".into()),
        )
        .init();

    let db_path = std::env::var("PENSION_DB").unwrap_or_else(|_| "pension.db".to_string());
    let conn = Connection::open(&db_path).expect("Failed to open database");
    setup_database(&conn).expect("Failed to set up database schema");
    info!(db_path, "database opened");

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/contributions/monthly", post(post_monthly))
        .route("/contributions/voluntary", post(post_voluntary))
        .route("/members/:id/contributions", get(get_contributions))
        .route("/members/:id/statement", get(get_statement))
        .route("/members/:id/eligibility", get(get_eligibility))
        .route("/jobs/validation", post(post_validation_job))
        .route("/jobs/eligibility", post(post_eligibility_job))
        .route("/jobs/failed-transactions", post(post_failed_transaction_job))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = std::env::var("PENSION_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!(addr, "server running");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
