pub mod engine;
pub mod pagination;
pub mod recommendations;
pub mod rules;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Réponse d'erreur API
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// Code d'erreur
    pub err_code: i32,
    /// Message d'erreur
    pub err_msg: String,
    /// Identifiant de trace
    pub trace_id: String,
}

/// Enveloppe de réponse API uniforme
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// Code d'erreur (0 en cas de succès)
    pub err_code: i32,
    /// Message d'erreur ("success" en cas de succès)
    pub err_msg: String,
    /// Identifiant de trace
    pub trace_id: String,
    /// Données métier
    pub data: Option<T>,
}

/// Structure de pagination
#[derive(Serialize, ToSchema)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    /// Éléments de la page
    pub items: Vec<T>,
    /// Nombre total d'éléments
    pub total: u64,
    /// Taille de page
    pub limit: usize,
    /// Décalage
    pub offset: usize,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: 0,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

pub fn success_paginated_response<T>(
    status: StatusCode,
    trace_id: &str,
    items: Vec<T>,
    total: u64,
    limit: usize,
    offset: usize,
) -> Response
where
    T: Serialize,
{
    success_response(
        status,
        trace_id,
        PaginatedData {
            items,
            total,
            limit,
            offset,
        },
    )
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "not_found" => 1004,
        "conflict" => 1005,
        "duplicate_rule_code" => 1101,
        "invalid_severity" => 1102,
        "invalid_action_type" => 1103,
        "storage_error" => 1501,
        "internal_error" => 1500,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// État de santé du service
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// Version du service
    version: String,
    /// Durée de fonctionnement (secondes)
    uptime_secs: i64,
    /// Nombre de règles actives
    active_rules: u64,
    /// État du stockage
    storage_status: String,
}

/// Vérifie l'état de santé du service.
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "État de santé du service", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (chrono::Utc::now() - state.start_time).num_seconds();
    let (active_rules, storage_status) = match state
        .store
        .count_rules(&agrimon_storage::RuleFilter {
            enabled_eq: Some(true),
            ..Default::default()
        })
        .await
    {
        Ok(count) => (count, "ok".to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Health check storage probe failed");
            (0, "error".to_string())
        }
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            active_rules,
            storage_status,
        },
    )
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .merge(engine::engine_routes())
        .merge(rules::rule_routes())
        .merge(recommendations::recommendation_routes())
}
