//! Project API endpoints (read-only).

use axum::extract::{rejection::QueryRejection, Path, Query, State};
use serde::Deserialize;

use super::{error, rejected, respond, success, ApiResult};
use crate::errors::AppError;
use crate::models::Project;
use crate::validation::parse_id;
use crate::AppState;

/// Query string for `GET /api/projects`.
#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// GET /api/projects - List projects, optionally by category.
pub async fn list_projects(
    State(state): State<AppState>,
    query: Result<Query<ProjectQuery>, QueryRejection>,
) -> ApiResult<Vec<Project>> {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error(rejected(rejection), &state),
    };
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    respond(state.repo.list_projects(category).await, &state)
}

/// GET /api/projects/:id - Get a single project.
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    if let Err(e) = parse_id("project", &id) {
        return error(e, &state);
    }

    match state.repo.get_project(&id).await {
        Ok(Some(project)) => success(project),
        Ok(None) => error(
            AppError::NotFound(format!("Project {} not found", id)),
            &state,
        ),
        Err(e) => error(e, &state),
    }
}
