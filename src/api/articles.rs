//! Article API endpoints.
//!
//! Create and update take `multipart/form-data` with text fields `title`,
//! `description`, `category`, `code` and image files `avatar` and `img`.

use std::sync::Arc;

use axum::extract::{
    multipart::{Multipart, MultipartError, MultipartRejection},
    rejection::QueryRejection,
    Path, Query, State,
};
use tokio::task::JoinSet;

use super::{created, done, error, rejected, respond, success_with_message, ApiResult};
use crate::errors::AppError;
use crate::media::{bounded, discard, ImageUpload, MediaStore, AVATAR_FOLDER, IMAGE_FOLDER};
use crate::models::{Article, ArticleListQuery, ArticlePage, ArticlePatch, NewArticle, StoredImage};
use crate::validation::{parse_id, sanitize_line, sanitize_text, validate_article};
use crate::AppState;

/// Raw multipart fields of an article form.
#[derive(Debug, Default)]
struct ArticleForm {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    code: Option<String>,
    avatar: Option<ImageUpload>,
    image: Option<ImageUpload>,
}

impl ArticleForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = ArticleForm::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "avatar" | "img" => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await.map_err(bad_multipart)?;
                    // Browsers send an empty part for an untouched file input.
                    if bytes.is_empty() {
                        continue;
                    }
                    let upload = ImageUpload {
                        field: name.clone(),
                        content_type,
                        bytes,
                    };
                    if name == "avatar" {
                        form.avatar = Some(upload);
                    } else {
                        form.image = Some(upload);
                    }
                }
                "title" => {
                    let text = field.text().await.map_err(bad_multipart)?;
                    form.title = Some(sanitize_line(&text));
                }
                "description" => {
                    let text = field.text().await.map_err(bad_multipart)?;
                    form.description = Some(sanitize_text(&text));
                }
                "category" => {
                    let text = field.text().await.map_err(bad_multipart)?;
                    form.category = Some(sanitize_line(&text));
                }
                "code" => form.code = Some(field.text().await.map_err(bad_multipart)?),
                other => tracing::debug!("Ignoring unexpected form field '{}'", other),
            }
        }

        Ok(form)
    }

    /// Validate every text field and image before anything is uploaded.
    ///
    /// With `complete` set (creates), absent text fields count as empty.
    fn validate(&self, max_upload_bytes: usize, complete: bool) -> Result<(), AppError> {
        validate_article(
            text_field(&self.title, complete),
            text_field(&self.description, complete),
            text_field(&self.category, complete),
        )?;
        for upload in [&self.avatar, &self.image].into_iter().flatten() {
            upload.validate(max_upload_bytes)?;
        }
        Ok(())
    }
}

fn text_field(value: &Option<String>, complete: bool) -> Option<&str> {
    match value {
        Some(value) => Some(value.as_str()),
        None if complete => Some(""),
        None => None,
    }
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid form data: {}", err))
}

/// Upload an optional image within the configured time budget.
async fn upload_image(
    state: &AppState,
    upload: Option<&ImageUpload>,
    folder: &str,
) -> Result<Option<StoredImage>, AppError> {
    match upload {
        Some(upload) => {
            let what = format!("Upload of {}", upload.field);
            bounded(
                state.config.upstream_timeout,
                &what,
                state.media.upload(upload, folder),
            )
            .await
            .map(Some)
        }
        None => Ok(None),
    }
}

/// Delete assets concurrently, best-effort, and wait for all of them.
async fn discard_assets(state: &AppState, asset_refs: Vec<String>) {
    let mut tasks = JoinSet::new();
    for asset_ref in asset_refs {
        let media: Arc<dyn MediaStore> = state.media.clone();
        let budget = state.config.upstream_timeout;
        tasks.spawn(async move { discard(media.as_ref(), &asset_ref, budget).await });
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::warn!("Media deletion task failed: {}", e);
        }
    }
}

/// GET /api/articles - Paginated, filterable article list.
pub async fn list_articles(
    State(state): State<AppState>,
    query: Result<Query<ArticleListQuery>, QueryRejection>,
) -> ApiResult<ArticlePage> {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error(rejected(rejection), &state),
    };

    respond(state.repo.list_articles(&query).await, &state)
}

/// GET /api/articles/:id - Fetch an article, counting a view.
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Article> {
    if let Err(e) = parse_id("article", &id) {
        return error(e, &state);
    }

    respond(state.repo.record_view(&id).await, &state)
}

/// GET /api/articles/slug/:slug - Fetch an article by slug, counting a view.
pub async fn get_article_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Article> {
    respond(state.repo.record_view_by_slug(&slug).await, &state)
}

/// POST /api/articles - Create an article with its avatar and cover image.
pub async fn create_article(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Article> {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return error(rejected(rejection), &state),
    };

    match create_article_inner(&state, multipart).await {
        Ok(article) => {
            tracing::info!("Created article '{}' ({})", article.slug, article.id);
            created(article, "Article created successfully")
        }
        Err(e) => error(e, &state),
    }
}

async fn create_article_inner(state: &AppState, multipart: Multipart) -> Result<Article, AppError> {
    let form = ArticleForm::read(multipart).await?;
    form.validate(state.config.max_upload_bytes, true)?;

    let (Some(avatar), Some(image)) = (&form.avatar, &form.image) else {
        return Err(AppError::Validation(
            "Both avatar and img images are required".to_string(),
        ));
    };

    let (avatar, image) = tokio::try_join!(
        upload_image(state, Some(avatar), AVATAR_FOLDER),
        upload_image(state, Some(image), IMAGE_FOLDER),
    )?;
    let (Some(avatar), Some(image)) = (avatar, image) else {
        return Err(AppError::Internal("Image upload returned no asset".to_string()));
    };

    let new_article = NewArticle {
        category: form.category.unwrap_or_default(),
        title: form.title.unwrap_or_default(),
        description: form.description.unwrap_or_default(),
        code: form.code.unwrap_or_default(),
        avatar,
        image,
    };

    state.repo.create_article(&new_article).await.map_err(|e| {
        tracing::warn!(
            "Article insert failed, orphaned media assets {} and {}: {}",
            new_article.avatar.asset_ref,
            new_article.image.asset_ref,
            e
        );
        e
    })
}

/// PUT /api/articles/:id - Update an article, replacing any images sent.
pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Article> {
    if let Err(e) = parse_id("article", &id) {
        return error(e, &state);
    }
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return error(rejected(rejection), &state),
    };

    match update_article_inner(&state, &id, multipart).await {
        Ok(article) => success_with_message(article, "Article updated successfully"),
        Err(e) => error(e, &state),
    }
}

async fn update_article_inner(
    state: &AppState,
    id: &str,
    multipart: Multipart,
) -> Result<Article, AppError> {
    let form = ArticleForm::read(multipart).await?;
    form.validate(state.config.max_upload_bytes, false)?;

    let mut patch = ArticlePatch {
        category: form.category,
        title: form.title,
        description: form.description,
        code: form.code,
        avatar: None,
        image: None,
    };
    if patch.is_empty() && form.avatar.is_none() && form.image.is_none() {
        return Err(AppError::Validation("No changes provided".to_string()));
    }
    if !state.repo.article_exists(id).await? {
        return Err(AppError::NotFound(format!("Article {} not found", id)));
    }

    let (avatar, image) = tokio::try_join!(
        upload_image(state, form.avatar.as_ref(), AVATAR_FOLDER),
        upload_image(state, form.image.as_ref(), IMAGE_FOLDER),
    )?;
    patch.avatar = avatar;
    patch.image = image;

    let update = match state.repo.update_article(id, &patch).await {
        Ok(update) => update,
        Err(e) => {
            let orphans: Vec<&str> = [&patch.avatar, &patch.image]
                .into_iter()
                .flatten()
                .map(|img| img.asset_ref.as_str())
                .collect();
            if !orphans.is_empty() {
                tracing::warn!(
                    "Article update failed, orphaned media assets {:?}: {}",
                    orphans,
                    e
                );
            }
            return Err(e);
        }
    };

    discard_assets(state, update.replaced_assets).await;
    tracing::info!("Updated article {}", id);
    Ok(update.article)
}

/// DELETE /api/articles/:id - Delete an article and its images.
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if let Err(e) = parse_id("article", &id) {
        return error(e, &state);
    }

    let article = match state.repo.get_article(&id).await {
        Ok(Some(article)) => article,
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Article {} not found", id)),
                &state,
            )
        }
        Err(e) => return error(e, &state),
    };

    let assets = vec![article.avatar_asset_ref, article.image_asset_ref];
    let ((), deleted) = tokio::join!(
        discard_assets(&state, assets),
        state.repo.delete_article(&id)
    );

    match deleted {
        Ok(_) => done("Article deleted successfully"),
        Err(e) => error(e, &state),
    }
}
