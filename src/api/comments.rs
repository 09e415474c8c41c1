//! Comment API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::{created, done, error, rejected, respond, ApiResult};
use crate::models::{Comment, CreateCommentRequest, NewComment};
use crate::validation::{
    parse_id, sanitize_line, sanitize_text, validate_comment, ANONYMOUS_COMMENTER,
};
use crate::AppState;

/// GET /api/articles/:id/comments - Comments on an article, newest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> ApiResult<Vec<Comment>> {
    if let Err(e) = parse_id("article", &article_id) {
        return error(e, &state);
    }

    respond(state.repo.list_comments(&article_id).await, &state)
}

/// POST /api/articles/:id/comments - Post a comment.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> ApiResult<Comment> {
    if let Err(e) = parse_id("article", &article_id) {
        return error(e, &state);
    }
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error(rejected(rejection), &state),
    };

    let user = request
        .user
        .as_deref()
        .map(sanitize_line)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| ANONYMOUS_COMMENTER.to_string());
    let text = sanitize_text(&request.text);

    if let Err(e) = validate_comment(&user, &text) {
        return error(e, &state);
    }

    let comment = NewComment {
        article_id,
        user,
        text,
    };
    match state.repo.create_comment(&comment).await {
        Ok(comment) => created(comment, "Comment added successfully"),
        Err(e) => error(e, &state),
    }
}

/// POST /api/comments/:id/like - Increment a comment's like counter.
pub async fn like_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Comment> {
    if let Err(e) = parse_id("comment", &id) {
        return error(e, &state);
    }

    respond(state.repo.like_comment(&id).await, &state)
}

/// DELETE /api/comments/:id - Delete a comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if let Err(e) = parse_id("comment", &id) {
        return error(e, &state);
    }

    match state.repo.delete_comment(&id).await {
        Ok(()) => done("Comment deleted successfully"),
        Err(e) => {
            if e.is_internal() {
                tracing::error!("Failed to delete comment {}: {}", id, e);
            }
            error(e, &state)
        }
    }
}
