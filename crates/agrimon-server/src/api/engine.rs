use crate::state::AppState;
use agrimon_common::types::RunSummary;
use agrimon_engine::error::EngineError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Résultat d'une exécution du moteur de règles
#[derive(Serialize, ToSchema)]
pub struct RunResponse {
    /// Toujours `true` : le catalogue a été chargé et le cycle est terminé
    pub success: bool,
    #[serde(flatten)]
    pub summary: RunSummary,
}

/// Échec de chargement du catalogue de règles
#[derive(Serialize, ToSchema)]
pub struct RunErrorResponse {
    /// Toujours `false`
    pub success: bool,
    /// Cause de l'échec
    pub error: String,
    /// Horodatage de l'échec
    pub timestamp: DateTime<Utc>,
}

/// Déclenche une exécution complète du moteur de règles.
///
/// La réponse reste `200` tant que le catalogue a pu être chargé, même si
/// des règles individuelles ont échoué : consulter `rules_evaluated` et le
/// détail par règle pour détecter les échecs partiels.
#[utoipa::path(
    post,
    path = "/v1/engine/run",
    tag = "Engine",
    responses(
        (status = 200, description = "Synthèse de l'exécution", body = RunResponse),
        (status = 500, description = "Catalogue de règles indisponible", body = RunErrorResponse)
    )
)]
async fn run_engine(State(state): State<AppState>) -> Response {
    match state.runner.run().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(RunResponse {
                success: true,
                summary,
            }),
        )
            .into_response(),
        Err(e) => {
            // Only a catalog load failure reaches here; per-rule failures
            // are folded into the summary.
            debug_assert!(matches!(e, EngineError::CatalogUnavailable(_)));
            tracing::error!(error = %e, "Engine run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RunErrorResponse {
                    success: false,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                }),
            )
                .into_response()
        }
    }
}

pub fn engine_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(run_engine))
}
