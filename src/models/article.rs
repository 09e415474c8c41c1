//! Article model and list query parameters.

use serde::{Deserialize, Serialize};

/// A published article with its cover images and engagement counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    /// Free-text label matched case-insensitively against category names
    pub category: String,
    pub avatar_url: String,
    pub avatar_asset_ref: String,
    pub image_url: String,
    pub image_asset_ref: String,
    pub title: String,
    pub description: String,
    pub code: String,
    pub slug: String,
    pub views: i64,
    pub likes: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Validated fields of an article about to be inserted.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub category: String,
    pub title: String,
    pub description: String,
    pub code: String,
    pub avatar: StoredImage,
    pub image: StoredImage,
}

/// Validated changes to an existing article. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ArticlePatch {
    pub category: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub avatar: Option<StoredImage>,
    pub image: Option<StoredImage>,
}

impl ArticlePatch {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.code.is_none()
            && self.avatar.is_none()
            && self.image.is_none()
    }
}

/// URL and deletion handle of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub asset_ref: String,
}

/// Result of an article update: the new record plus assets it no longer uses.
#[derive(Debug, Clone)]
pub struct ArticleUpdate {
    pub article: Article,
    pub replaced_assets: Vec<String>,
}

/// Column an article list is ordered by (always descending).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArticleSort {
    #[default]
    CreatedAt,
    UpdatedAt,
    Views,
    Likes,
}

impl ArticleSort {
    pub fn column(&self) -> &'static str {
        match self {
            ArticleSort::CreatedAt => "created_at",
            ArticleSort::UpdatedAt => "updated_at",
            ArticleSort::Views => "views",
            ArticleSort::Likes => "likes",
        }
    }
}

/// Query string for `GET /api/articles`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<ArticleSort>,
}

/// A page of articles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    pub pagination: super::Pagination,
}
