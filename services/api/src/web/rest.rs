//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints, the router
//! assembly, and the master definition for the OpenAPI specification. This
//! surface is the boundary the (out-of-scope) presentation layer talks to:
//! it supplies identifier resolution, habit controls, the question/send
//! action, the plan selector, and the data-export action.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use chrono::NaiveDate;
use habitchat_core::{AskOutcome, Plan, PortError, UpgradeOutcome, UserRecord};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{OpenApi, ToSchema};

use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_user_handler,
        add_habit_handler,
        delete_habit_handler,
        ask_handler,
        delete_message_handler,
        change_plan_handler,
        export_handler,
    ),
    components(
        schemas(
            UserRecordResponse,
            QAPairResponse,
            AddHabitRequest,
            AskRequest,
            AskResponse,
            ChangePlanRequest,
            ChangePlanResponse,
        )
    ),
    tags(
        (name = "Habitchat API", description = "API endpoints for the habit checklist and quota-gated chat.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The full user record as rendered to the presentation layer, with the
/// current plan allowance alongside the counter.
#[derive(Serialize, ToSchema)]
pub struct UserRecordResponse {
    identifier: String,
    plan: String,
    messages_used_today: u32,
    allowance: u32,
    last_activity_date: NaiveDate,
    habits: Vec<String>,
    conversation: Vec<QAPairResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct QAPairResponse {
    question: String,
    answer: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AddHabitRequest {
    text: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AskRequest {
    question: String,
}

/// The outcome of one ask action. `outcome` is one of `answered`,
/// `quota_exceeded`, `generation_failed`, or `unavailable`; the caller
/// decides how to render each.
#[derive(Serialize, ToSchema)]
pub struct AskResponse {
    outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<String>,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    messages_used_today: u32,
    allowance: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePlanRequest {
    plan: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChangePlanResponse {
    plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscription_id: Option<String>,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn port_error_response(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::Validation(_) => StatusCode::BAD_REQUEST,
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        PortError::Collaborator(_) => StatusCode::BAD_GATEWAY,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("request failed: {e}");
    }
    (status, e.to_string())
}

fn user_response(state: &AppState, record: UserRecord) -> UserRecordResponse {
    let allowance = state.config.quota.allowance(record.plan);
    UserRecordResponse {
        identifier: record.identifier,
        plan: record.plan.as_str().to_string(),
        messages_used_today: record.messages_used_today,
        allowance,
        last_activity_date: record.last_activity_date,
        habits: record.habits,
        conversation: record
            .conversation
            .into_iter()
            .map(|qa| QAPairResponse {
                question: qa.question,
                answer: qa.answer,
            })
            .collect(),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Resolve a user record, creating it on first sight and applying the daily
/// quota reset.
#[utoipa::path(
    get,
    path = "/users/{identifier}",
    responses(
        (status = 200, description = "The resolved, current-day-consistent record", body = UserRecordResponse),
        (status = 500, description = "The store failed; nothing was resolved")
    ),
    params(("identifier" = String, Path, description = "The user's identifier (e.g., email)."))
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lock = state.lock_for(&identifier).await;
    let _guard = lock.lock().await;

    let record = state
        .sessions
        .resolve(&identifier)
        .await
        .map_err(port_error_response)?;
    Ok(Json(user_response(&state, record)))
}

/// Append a habit to the user's list.
#[utoipa::path(
    post,
    path = "/users/{identifier}/habits",
    request_body = AddHabitRequest,
    responses(
        (status = 200, description = "Habit added", body = UserRecordResponse),
        (status = 400, description = "Blank habit text")
    ),
    params(("identifier" = String, Path, description = "The user's identifier."))
)]
pub async fn add_habit_handler(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    Json(req): Json<AddHabitRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lock = state.lock_for(&identifier).await;
    let _guard = lock.lock().await;

    let mut record = state
        .sessions
        .resolve(&identifier)
        .await
        .map_err(port_error_response)?;
    state
        .habits
        .add_habit(&mut record, &req.text)
        .await
        .map_err(port_error_response)?;
    Ok(Json(user_response(&state, record)))
}

/// Delete the habit at `index`.
#[utoipa::path(
    delete,
    path = "/users/{identifier}/habits/{index}",
    responses(
        (status = 200, description = "Habit removed", body = UserRecordResponse),
        (status = 400, description = "No habit at that index")
    ),
    params(
        ("identifier" = String, Path, description = "The user's identifier."),
        ("index" = usize, Path, description = "Zero-based position in the habit list.")
    )
)]
pub async fn delete_habit_handler(
    State(state): State<Arc<AppState>>,
    Path((identifier, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lock = state.lock_for(&identifier).await;
    let _guard = lock.lock().await;

    let mut record = state
        .sessions
        .resolve(&identifier)
        .await
        .map_err(port_error_response)?;
    state
        .habits
        .delete_habit(&mut record, index)
        .await
        .map_err(port_error_response)?;
    Ok(Json(user_response(&state, record)))
}

/// Ask the generation collaborator one question, gated by the daily quota.
#[utoipa::path(
    post,
    path = "/users/{identifier}/chat",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Ask outcome (answered, quota_exceeded, generation_failed, or unavailable)", body = AskResponse),
        (status = 400, description = "Blank question")
    ),
    params(("identifier" = String, Path, description = "The user's identifier."))
)]
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lock = state.lock_for(&identifier).await;
    let _guard = lock.lock().await;

    let mut record = state
        .sessions
        .resolve(&identifier)
        .await
        .map_err(port_error_response)?;
    let outcome = state
        .chat
        .ask(&mut record, &req.question)
        .await
        .map_err(port_error_response)?;

    let allowance = state.config.quota.allowance(record.plan);
    let response = match outcome {
        AskOutcome::Answered { answer, cached } => AskResponse {
            outcome: "answered".to_string(),
            answer: Some(answer),
            cached,
            detail: None,
            messages_used_today: record.messages_used_today,
            allowance,
        },
        AskOutcome::QuotaExceeded { used, allowance } => AskResponse {
            outcome: "quota_exceeded".to_string(),
            answer: None,
            cached: false,
            detail: None,
            messages_used_today: used,
            allowance,
        },
        AskOutcome::GenerationFailed {
            recorded_answer,
            detail,
        } => AskResponse {
            outcome: "generation_failed".to_string(),
            answer: Some(recorded_answer),
            cached: false,
            detail: Some(detail),
            messages_used_today: record.messages_used_today,
            allowance,
        },
        AskOutcome::Unavailable => AskResponse {
            outcome: "unavailable".to_string(),
            answer: None,
            cached: false,
            detail: None,
            messages_used_today: record.messages_used_today,
            allowance,
        },
    };
    Ok(Json(response))
}

/// Delete one question/answer exchange at `index`.
#[utoipa::path(
    delete,
    path = "/users/{identifier}/chat/{index}",
    responses(
        (status = 200, description = "Message removed", body = UserRecordResponse),
        (status = 400, description = "No message at that index")
    ),
    params(
        ("identifier" = String, Path, description = "The user's identifier."),
        ("index" = usize, Path, description = "Zero-based position in the conversation log.")
    )
)]
pub async fn delete_message_handler(
    State(state): State<Arc<AppState>>,
    Path((identifier, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lock = state.lock_for(&identifier).await;
    let _guard = lock.lock().await;

    let mut record = state
        .sessions
        .resolve(&identifier)
        .await
        .map_err(port_error_response)?;
    state
        .chat
        .delete_message(&mut record, index)
        .await
        .map_err(port_error_response)?;
    Ok(Json(user_response(&state, record)))
}

/// Change the user's plan. Paid targets only take effect once the billing
/// vendor reports success.
#[utoipa::path(
    post,
    path = "/users/{identifier}/plan",
    request_body = ChangePlanRequest,
    responses(
        (status = 200, description = "Plan changed", body = ChangePlanResponse),
        (status = 400, description = "Unknown plan name"),
        (status = 502, description = "The billing vendor rejected the subscription; plan unchanged"),
        (status = 503, description = "Billing is not configured")
    ),
    params(("identifier" = String, Path, description = "The user's identifier."))
)]
pub async fn change_plan_handler(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    Json(req): Json<ChangePlanRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let target = req
        .plan
        .parse::<Plan>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let lock = state.lock_for(&identifier).await;
    let _guard = lock.lock().await;

    let mut record = state
        .sessions
        .resolve(&identifier)
        .await
        .map_err(port_error_response)?;
    let outcome = state
        .plans
        .upgrade(&mut record, target)
        .await
        .map_err(port_error_response)?;

    let subscription_id = match outcome {
        UpgradeOutcome::Applied => None,
        UpgradeOutcome::SubscriptionCreated { subscription_id } => Some(subscription_id),
    };
    Ok(Json(ChangePlanResponse {
        plan: record.plan.as_str().to_string(),
        subscription_id,
    }))
}

/// Export the current record as a downloadable JSON document.
#[utoipa::path(
    get,
    path = "/users/{identifier}/export",
    responses(
        (status = 200, description = "The serialized record as a JSON attachment")
    ),
    params(("identifier" = String, Path, description = "The user's identifier."))
)]
pub async fn export_handler(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lock = state.lock_for(&identifier).await;
    let _guard = lock.lock().await;

    let record = state
        .sessions
        .resolve(&identifier)
        .await
        .map_err(port_error_response)?;
    let json = serde_json::to_string_pretty(&record).map_err(|e| {
        error!("failed to serialize export: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to serialize export".to_string(),
        )
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"habitchat-export.json\"".to_string(),
            ),
        ],
        json,
    ))
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

//=========================================================================================
// Router Assembly
//=========================================================================================

/// Builds the application router. Shared between the server binary and the
/// handler tests.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/users/{identifier}", get(get_user_handler))
        .route("/users/{identifier}/habits", post(add_habit_handler))
        .route(
            "/users/{identifier}/habits/{index}",
            delete(delete_habit_handler),
        )
        .route("/users/{identifier}/chat", post(ask_handler))
        .route(
            "/users/{identifier}/chat/{index}",
            delete(delete_message_handler),
        )
        .route("/users/{identifier}/plan", post(change_plan_handler))
        .route("/users/{identifier}/export", get(export_handler))
        .with_state(state)
}
