use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_empty_response, success_paginated_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use agrimon_common::types::{ActionType, Severity};
use agrimon_storage::{RuleFilter, RuleRow, RuleUpdate};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Règle de surveillance (résumé)
#[derive(Serialize, ToSchema)]
pub struct RuleResponse {
    /// Identifiant unique
    pub id: String,
    /// Code stable de la règle (clé de déduplication)
    pub code: String,
    /// Nom lisible
    pub name: String,
    /// Gravité (critical / high / medium / info)
    pub severity: String,
    /// Type d'action (alert / notification / warning / recommendation)
    pub action_type: String,
    /// Règle active
    pub enabled: bool,
}

/// Règle de surveillance (détail)
#[derive(Serialize, ToSchema)]
struct RuleDetailResponse {
    id: String,
    code: String,
    name: String,
    description: Option<String>,
    condition_sql: String,
    message_template: String,
    severity: String,
    action_type: String,
    enabled: bool,
    source: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RuleRow> for RuleDetailResponse {
    fn from(r: RuleRow) -> Self {
        Self {
            id: r.id,
            code: r.code,
            name: r.name,
            description: r.description,
            condition_sql: r.condition_sql,
            message_template: r.message_template,
            severity: r.severity,
            action_type: r.action_type,
            enabled: r.enabled,
            source: r.source,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Paramètres de liste des règles
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct ListRulesParams {
    /// Filtre code (contient)
    #[param(required = false, rename = "code__contains")]
    #[serde(rename = "code__contains")]
    code_contains: Option<String>,
    /// Filtre nom (contient)
    #[param(required = false, rename = "name__contains")]
    #[serde(rename = "name__contains")]
    name_contains: Option<String>,
    /// Gravité (égalité)
    #[param(required = false, rename = "severity__eq")]
    #[serde(rename = "severity__eq")]
    severity_eq: Option<String>,
    /// Type d'action (égalité)
    #[param(required = false, rename = "action_type__eq")]
    #[serde(rename = "action_type__eq")]
    action_type_eq: Option<String>,
    /// Règle active (égalité)
    #[param(required = false, rename = "enabled__eq")]
    #[serde(rename = "enabled__eq")]
    enabled_eq: Option<bool>,
    /// Taille de page (défaut 20)
    #[param(required = false)]
    #[serde(
        default,
        deserialize_with = "crate::api::pagination::deserialize_optional_u64"
    )]
    limit: Option<u64>,
    /// Décalage (défaut 0)
    #[param(required = false)]
    #[serde(
        default,
        deserialize_with = "crate::api::pagination::deserialize_optional_u64"
    )]
    offset: Option<u64>,
}

/// Liste paginée des règles de surveillance.
/// Tri par défaut : `created_at` décroissant.
#[utoipa::path(
    get,
    path = "/v1/rules",
    tag = "Rules",
    params(ListRulesParams),
    responses(
        (status = 200, description = "Liste paginée des règles", body = Vec<RuleResponse>)
    )
)]
async fn list_rules(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ListRulesParams>,
) -> impl IntoResponse {
    let limit = PaginationParams::resolve_limit(params.limit);
    let offset = PaginationParams::resolve_offset(params.offset);
    let filter = RuleFilter {
        code_contains: params.code_contains,
        name_contains: params.name_contains,
        severity_eq: params.severity_eq,
        action_type_eq: params.action_type_eq,
        enabled_eq: params.enabled_eq,
    };

    let total = match state.store.count_rules(&filter).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count rules");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
            .into_response();
        }
    };

    match state.store.list_rules(&filter, limit, offset).await {
        Ok(rows) => {
            let items: Vec<RuleResponse> = rows
                .into_iter()
                .map(|r| RuleResponse {
                    id: r.id,
                    code: r.code,
                    name: r.name,
                    severity: r.severity,
                    action_type: r.action_type,
                    enabled: r.enabled,
                })
                .collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list rules");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
            .into_response()
        }
    }
}

/// Détail d'une règle.
#[utoipa::path(
    get,
    path = "/v1/rules/{id}",
    tag = "Rules",
    params(("id" = String, Path, description = "Identifiant de la règle")),
    responses(
        (status = 200, description = "Détail de la règle", body = RuleDetailResponse),
        (status = 404, description = "Règle inconnue", body = crate::api::ApiError)
    )
)]
async fn get_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_rule_by_id(&id).await {
        Ok(Some(row)) => {
            success_response(StatusCode::OK, &trace_id, RuleDetailResponse::from(row))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Rule '{}' not found", id),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Création d'une règle de surveillance
#[derive(Debug, Deserialize, ToSchema)]
struct CreateRuleRequest {
    /// Code stable (obligatoire, unique, immuable)
    code: String,
    /// Nom lisible (obligatoire)
    name: String,
    /// Description (optionnel)
    #[serde(default)]
    description: Option<String>,
    /// Condition SQL évaluée sur le jeu de données (obligatoire)
    condition_sql: String,
    /// Modèle de message avec variables {champ} (obligatoire)
    message_template: String,
    /// Gravité (critical / high / medium / info)
    severity: String,
    /// Type d'action (alert / notification / warning / recommendation)
    action_type: String,
    /// Règle active (défaut true)
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Crée une règle de surveillance.
#[utoipa::path(
    post,
    path = "/v1/rules",
    tag = "Rules",
    request_body = CreateRuleRequest,
    responses(
        (status = 201, description = "Règle créée", body = RuleDetailResponse),
        (status = 400, description = "Gravité ou type d'action invalide", body = crate::api::ApiError),
        (status = 409, description = "Code de règle déjà utilisé", body = crate::api::ApiError)
    )
)]
async fn create_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateRuleRequest>,
) -> impl IntoResponse {
    if req.severity.parse::<Severity>().is_err() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "invalid_severity",
            &format!("Unknown severity '{}'", req.severity),
        );
    }
    if req.action_type.parse::<ActionType>().is_err() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "invalid_action_type",
            &format!("Unknown action type '{}'", req.action_type),
        );
    }

    match state.store.get_rule_by_code(&req.code).await {
        Ok(Some(_)) => {
            return error_response(
                StatusCode::CONFLICT,
                &trace_id,
                "duplicate_rule_code",
                &format!("Rule code '{}' already exists", req.code),
            );
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Failed to check rule code");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    }

    let now = Utc::now();
    let row = RuleRow {
        id: agrimon_common::id::next_id(),
        code: req.code,
        name: req.name,
        description: req.description,
        condition_sql: req.condition_sql,
        message_template: req.message_template,
        severity: req.severity,
        action_type: req.action_type,
        enabled: req.enabled,
        source: "api".to_string(),
        created_at: now,
        updated_at: now,
    };

    match state.store.insert_rule(&row).await {
        Ok(inserted) => {
            tracing::info!(code = %inserted.code, id = %inserted.id, "Rule created");
            success_response(
                StatusCode::CREATED,
                &trace_id,
                RuleDetailResponse::from(inserted),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Mise à jour d'une règle (le code est immuable)
#[derive(Debug, Default, Deserialize, ToSchema)]
struct UpdateRuleRequest {
    /// Nom (optionnel)
    name: Option<String>,
    /// Description (optionnel ; null pour effacer)
    #[serde(default, deserialize_with = "deserialize_double_option")]
    description: Option<Option<String>>,
    /// Condition SQL (optionnel)
    condition_sql: Option<String>,
    /// Modèle de message (optionnel)
    message_template: Option<String>,
    /// Gravité (optionnel)
    severity: Option<String>,
    /// Type d'action (optionnel)
    action_type: Option<String>,
    /// Règle active (optionnel)
    enabled: Option<bool>,
}

fn deserialize_double_option<'de, D>(
    deserializer: D,
) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Met à jour une règle existante.
#[utoipa::path(
    put,
    path = "/v1/rules/{id}",
    tag = "Rules",
    params(("id" = String, Path, description = "Identifiant de la règle")),
    request_body = UpdateRuleRequest,
    responses(
        (status = 200, description = "Règle mise à jour", body = RuleDetailResponse),
        (status = 400, description = "Gravité ou type d'action invalide", body = crate::api::ApiError),
        (status = 404, description = "Règle inconnue", body = crate::api::ApiError)
    )
)]
async fn update_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRuleRequest>,
) -> impl IntoResponse {
    if let Some(severity) = &req.severity {
        if severity.parse::<Severity>().is_err() {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "invalid_severity",
                &format!("Unknown severity '{severity}'"),
            );
        }
    }
    if let Some(action_type) = &req.action_type {
        if action_type.parse::<ActionType>().is_err() {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "invalid_action_type",
                &format!("Unknown action type '{action_type}'"),
            );
        }
    }

    let update = RuleUpdate {
        name: req.name,
        description: req.description,
        condition_sql: req.condition_sql,
        message_template: req.message_template,
        severity: req.severity,
        action_type: req.action_type,
        enabled: req.enabled,
    };

    match state.store.update_rule(&id, &update).await {
        Ok(Some(row)) => {
            tracing::info!(code = %row.code, id = %row.id, "Rule updated");
            success_response(StatusCode::OK, &trace_id, RuleDetailResponse::from(row))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Rule '{}' not found", id),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Supprime une règle.
#[utoipa::path(
    delete,
    path = "/v1/rules/{id}",
    tag = "Rules",
    params(("id" = String, Path, description = "Identifiant de la règle")),
    responses(
        (status = 200, description = "Règle supprimée"),
        (status = 404, description = "Règle inconnue", body = crate::api::ApiError)
    )
)]
async fn delete_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_rule(&id).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "Rule deleted"),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Rule '{}' not found", id),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

pub fn rule_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_rules, create_rule))
        .routes(routes!(get_rule, update_rule, delete_rule))
}
