use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::DocsConfig;
use crate::health::{ComponentHealth, ComponentStatus, HealthReport, OverallStatus};
use crate::metrics::MetricsSnapshot;
use crate::pagination::PaginationMeta;
use crate::routes::health;
use crate::state::AppState;

pub const OPENAPI_JSON_PATH: &str = "/api-doc/openapi.json";

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(title = "api-starter", description = "Backend starter service"),
    paths(health::healthz, health::readyz, health::health, health::metrics, health::version),
    components(schemas(
        HealthReport,
        ComponentHealth,
        ComponentStatus,
        OverallStatus,
        MetricsSnapshot,
        PaginationMeta
    )),
    tags((name = "health", description = "Liveness, readiness and component health"))
)]
pub struct ApiDoc;

/// Swagger UI at `docs.path`, or nothing when docs are disabled.
pub fn router(cfg: &DocsConfig) -> Router<AppState> {
    if !cfg.enabled {
        return Router::new();
    }
    Router::new().merge(SwaggerUi::new(cfg.path.clone()).url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
}
