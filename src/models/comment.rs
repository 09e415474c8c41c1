//! Comment model.

use serde::{Deserialize, Serialize};

/// A reader comment attached to an article.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub article_id: String,
    pub user: String,
    pub text: String,
    pub likes: i64,
    pub created_at: String,
}

/// Request body for posting a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Comment after sanitization, ready to persist.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub article_id: String,
    pub user: String,
    pub text: String,
}
