//! Like/view endpoints for articles.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
};
use serde::Deserialize;

use super::{error, rejected, respond, success_with_message, ApiResult};
use crate::engagement::{
    identity_for, Identity, LikeOutcome, LikeRequest, LikeStats, LikeStatus, RequestOrigin,
    UserQuery, ViewStats,
};
use crate::errors::AppError;
use crate::models::Article;
use crate::validation::parse_id;
use crate::AppState;

const DEFAULT_MOST_VIEWED: u32 = 5;
const MAX_MOST_VIEWED: u32 = 50;

/// Query string for `GET /api/articles/most-viewed`.
#[derive(Debug, Deserialize)]
pub struct MostViewedQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Work out who is liking: `userId` from the JSON body, then the query string,
/// then the caller's address.
fn resolve_identity(
    state: &AppState,
    query: &UserQuery,
    body: &Bytes,
    origin: RequestOrigin,
) -> Result<Identity, AppError> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        LikeRequest::default()
    } else {
        serde_json::from_slice::<LikeRequest>(body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?
    };

    let user_id = from_body.user_id.as_deref().or(query.user_id.as_deref());
    let identity = identity_for(user_id, origin, state.config.allow_anonymous_likes)?;
    if identity.is_anonymous() {
        tracing::debug!("No userId supplied, recording as {}", identity);
    }
    Ok(identity)
}

/// POST /api/articles/:id/like - Like an article once per identity.
pub async fn like_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    origin: RequestOrigin,
    query: Result<Query<UserQuery>, QueryRejection>,
    body: Bytes,
) -> ApiResult<LikeOutcome> {
    let result = async {
        parse_id("article", &id)?;
        let Query(query) = query.map_err(rejected)?;
        let identity = resolve_identity(&state, &query, &body, origin)?;
        state.repo.like_article(&id, &identity).await
    }
    .await;

    match result {
        Ok(outcome) => success_with_message(outcome, "Article liked"),
        Err(e) => error(e, &state),
    }
}

/// POST /api/articles/:id/unlike - Withdraw a like.
pub async fn unlike_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    origin: RequestOrigin,
    query: Result<Query<UserQuery>, QueryRejection>,
    body: Bytes,
) -> ApiResult<LikeOutcome> {
    let result = async {
        parse_id("article", &id)?;
        let Query(query) = query.map_err(rejected)?;
        let identity = resolve_identity(&state, &query, &body, origin)?;
        state.repo.unlike_article(&id, &identity).await
    }
    .await;

    match result {
        Ok(outcome) => success_with_message(outcome, "Article unliked"),
        Err(e) => error(e, &state),
    }
}

/// GET /api/articles/:id/like-status?userId= - Whether the caller likes the article.
pub async fn like_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    origin: RequestOrigin,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<LikeStatus> {
    let result = async {
        parse_id("article", &id)?;
        let Query(query) = query.map_err(rejected)?;
        let identity = identity_for(
            query.user_id.as_deref(),
            origin,
            state.config.allow_anonymous_likes,
        )?;
        state.repo.like_status(&id, &identity).await
    }
    .await;

    respond(result, &state)
}

/// GET /api/articles/:id/like-stats - Like counter of an article.
pub async fn like_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<LikeStats> {
    if let Err(e) = parse_id("article", &id) {
        return error(e, &state);
    }

    respond(state.repo.like_stats(&id).await, &state)
}

/// GET /api/articles/:id/view-stats - View counter of an article.
pub async fn view_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ViewStats> {
    if let Err(e) = parse_id("article", &id) {
        return error(e, &state);
    }

    respond(state.repo.view_stats(&id).await, &state)
}

/// GET /api/articles/most-viewed?limit= - Top articles by views.
pub async fn most_viewed(
    State(state): State<AppState>,
    query: Result<Query<MostViewedQuery>, QueryRejection>,
) -> ApiResult<Vec<Article>> {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error(rejected(rejection), &state),
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MOST_VIEWED)
        .clamp(1, MAX_MOST_VIEWED);

    respond(state.repo.most_viewed_articles(limit).await, &state)
}
