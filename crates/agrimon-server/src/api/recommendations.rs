use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use agrimon_common::types::RecommendationStatus;
use agrimon_storage::{RecommendationFilter, RecommendationRow, StorageError};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Recommandation ou alerte générée
#[derive(Serialize, ToSchema)]
pub struct RecommendationResponse {
    /// Identifiant unique
    pub id: String,
    /// Titre (préfixe de catégorie + code + nom de la règle)
    pub title: String,
    /// Message rendu pour le producteur
    pub message: String,
    /// Identifiant du producteur concerné
    pub producer_id: String,
    /// Code de la règle d'origine
    pub rule_code: String,
    /// Catégorie (alert / recommendation)
    pub category: String,
    /// Priorité (urgent / high / medium / low)
    pub priority: String,
    /// Sous-type d'affichage (traitement / surveillance / information / fertilisation)
    pub rec_type: String,
    /// Statut (pending / done / dismissed)
    pub status: String,
    /// Identité système ayant généré l'entrée
    pub generated_by: String,
    /// Date de création
    pub created_at: DateTime<Utc>,
    /// Date de mise à jour
    pub updated_at: DateTime<Utc>,
}

impl From<RecommendationRow> for RecommendationResponse {
    fn from(r: RecommendationRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            message: r.message,
            producer_id: r.producer_id,
            rule_code: r.rule_code,
            category: r.category,
            priority: r.priority,
            rec_type: r.rec_type,
            status: r.status,
            generated_by: r.generated_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Paramètres de liste des recommandations
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct ListRecommendationsParams {
    /// Statut (égalité : pending / done / dismissed)
    #[param(required = false, rename = "status__eq")]
    #[serde(rename = "status__eq")]
    status_eq: Option<String>,
    /// Catégorie (égalité : alert / recommendation)
    #[param(required = false, rename = "category__eq")]
    #[serde(rename = "category__eq")]
    category_eq: Option<String>,
    /// Priorité (égalité)
    #[param(required = false, rename = "priority__eq")]
    #[serde(rename = "priority__eq")]
    priority_eq: Option<String>,
    /// Producteur (égalité)
    #[param(required = false, rename = "producer_id__eq")]
    #[serde(rename = "producer_id__eq")]
    producer_id_eq: Option<String>,
    /// Code de règle (égalité)
    #[param(required = false, rename = "rule_code__eq")]
    #[serde(rename = "rule_code__eq")]
    rule_code_eq: Option<String>,
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

/// Liste paginée des recommandations et alertes.
/// Tri par défaut : `created_at` décroissant.
#[utoipa::path(
    get,
    path = "/v1/recommendations",
    tag = "Recommendations",
    params(ListRecommendationsParams),
    responses(
        (status = 200, description = "Liste paginée des recommandations", body = Vec<RecommendationResponse>)
    )
)]
async fn list_recommendations(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ListRecommendationsParams>,
) -> impl IntoResponse {
    let limit = PaginationParams::resolve_limit(params.limit);
    let offset = PaginationParams::resolve_offset(params.offset);
    let filter = RecommendationFilter {
        status_eq: params.status_eq,
        category_eq: params.category_eq,
        priority_eq: params.priority_eq,
        producer_id_eq: params.producer_id_eq,
        rule_code_eq: params.rule_code_eq,
    };

    let total = match state.store.count_recommendations(&filter).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count recommendations");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
            .into_response();
        }
    };

    match state.store.list_recommendations(&filter, limit, offset).await {
        Ok(rows) => {
            let items: Vec<RecommendationResponse> =
                rows.into_iter().map(RecommendationResponse::from).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list recommendations");
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

/// Synthèse des recommandations (comptes par statut, catégorie, priorité).
#[utoipa::path(
    get,
    path = "/v1/recommendations/summary",
    tag = "Recommendations",
    responses(
        (status = 200, description = "Synthèse des recommandations")
    )
)]
async fn recommendation_summary(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.recommendation_summary().await {
        Ok(summary) => success_response(StatusCode::OK, &trace_id, summary),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build recommendation summary");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Détail d'une recommandation.
#[utoipa::path(
    get,
    path = "/v1/recommendations/{id}",
    tag = "Recommendations",
    params(("id" = String, Path, description = "Identifiant de la recommandation")),
    responses(
        (status = 200, description = "Détail de la recommandation", body = RecommendationResponse),
        (status = 404, description = "Recommandation inconnue", body = crate::api::ApiError)
    )
)]
async fn get_recommendation(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_recommendation_by_id(&id).await {
        Ok(Some(row)) => {
            success_response(StatusCode::OK, &trace_id, RecommendationResponse::from(row))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Recommendation '{}' not found", id),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get recommendation");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

async fn transition_status(
    trace_id: &str,
    state: &AppState,
    id: &str,
    status: RecommendationStatus,
) -> axum::response::Response {
    match state.store.set_recommendation_status(id, status).await {
        Ok(row) => {
            tracing::info!(id = %row.id, status = %row.status, "Recommendation status updated");
            success_response(StatusCode::OK, trace_id, RecommendationResponse::from(row))
        }
        Err(StorageError::NotFound { .. }) => error_response(
            StatusCode::NOT_FOUND,
            trace_id,
            "not_found",
            &format!("Recommendation '{}' not found", id),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update recommendation status");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// Marque une recommandation comme traitée.
#[utoipa::path(
    post,
    path = "/v1/recommendations/{id}/done",
    tag = "Recommendations",
    params(("id" = String, Path, description = "Identifiant de la recommandation")),
    responses(
        (status = 200, description = "Recommandation traitée", body = RecommendationResponse),
        (status = 404, description = "Recommandation inconnue", body = crate::api::ApiError)
    )
)]
async fn mark_done(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    transition_status(&trace_id, &state, &id, RecommendationStatus::Done).await
}

/// Écarte une recommandation.
#[utoipa::path(
    post,
    path = "/v1/recommendations/{id}/dismiss",
    tag = "Recommendations",
    params(("id" = String, Path, description = "Identifiant de la recommandation")),
    responses(
        (status = 200, description = "Recommandation écartée", body = RecommendationResponse),
        (status = 404, description = "Recommandation inconnue", body = crate::api::ApiError)
    )
)]
async fn dismiss(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    transition_status(&trace_id, &state, &id, RecommendationStatus::Dismissed).await
}

pub fn recommendation_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_recommendations))
        .routes(routes!(recommendation_summary))
        .routes(routes!(get_recommendation))
        .routes(routes!(mark_done))
        .routes(routes!(dismiss))
}
