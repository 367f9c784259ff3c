use crate::error::AppError;
use crate::state::SharedState;
use axum::extract::{Query, State};
use axum::Json;
use extdocs_core::{CatalogEntry, PathContent, SubpagePath};
use serde::{Deserialize, Serialize};

// GET /request-path
#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub id: Option<String>,
    pub sub: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum PathResponse {
    Content(PathContent),
    Subpages { paths: Vec<SubpagePath> },
    Catalog { paths: Vec<CatalogEntry> },
}

pub async fn request_path(
    State(state): State<SharedState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<PathResponse>, AppError> {
    let id = query.id.filter(|id| !id.is_empty());
    let sub = query.sub.as_deref() == Some("true");

    let result = match id {
        Some(id) => state
            .router
            .render_path(&id)
            .await
            .map(PathResponse::Content)
            .map_err(|err| (id, err)),
        None if sub => state
            .router
            .subpages()
            .await
            .map(|paths| PathResponse::Subpages { paths })
            .map_err(|err| ("sub".to_string(), err)),
        None => state
            .router
            .catalog()
            .await
            .map(|paths| PathResponse::Catalog { paths })
            .map_err(|err| ("catalog".to_string(), err)),
    };

    result.map(Json).map_err(|(request, err)| {
        tracing::error!(request = %request, error = %err, "GET /request-path failed");
        AppError::from(err)
    })
}

// GET /status
#[derive(Serialize)]
pub struct ServiceStatus {
    pub service: String,
    pub source: String,
    pub development: bool,
}

pub async fn status(State(state): State<SharedState>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        service: "extdocs-service".to_string(),
        source: state.source.clone(),
        development: state.router.config().site.development,
    })
}
