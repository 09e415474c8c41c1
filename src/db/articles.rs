//! Article persistence and the engagement counters.
//!
//! `likes` is always recomputed from `article_likes` inside the transaction
//! that changes the like set, so the counter can never drift from the set.

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use super::repository::{adjust_category_count, now};
use super::Repository;
use crate::engagement::{Identity, LikeOutcome, LikeStats, LikeStatus, ViewStats};
use crate::errors::AppError;
use crate::models::{
    Article, ArticleListQuery, ArticlePage, ArticlePatch, ArticleUpdate, NewArticle, PageRequest,
    Pagination,
};
use crate::slug;

const ARTICLE_COLUMNS: &str = "id, category, avatar_url, avatar_asset_ref, image_url, image_asset_ref, title, description, code, slug, views, likes, created_at, updated_at";

impl Repository {
    pub async fn article_exists(&self, id: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM articles WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// List articles page by page, newest (or most viewed/liked) first.
    pub async fn list_articles(&self, query: &ArticleListQuery) -> Result<ArticlePage, AppError> {
        let page = PageRequest::new(query.page, query.limit);
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM articles");
        push_article_filters(&mut count, category, search);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM articles", ARTICLE_COLUMNS));
        push_article_filters(&mut select, category, search);
        let sort = query.sort_by.unwrap_or_default();
        select.push(format!(
            " ORDER BY {} DESC, created_at DESC, id DESC LIMIT ",
            sort.column()
        ));
        select.push_bind(page.limit as i64);
        select.push(" OFFSET ");
        select.push_bind(page.offset());

        let rows = select.build().fetch_all(&self.pool).await?;

        Ok(ArticlePage {
            articles: rows.iter().map(article_from_row).collect(),
            pagination: Pagination::new(page, total),
        })
    }

    /// Get an article by ID without touching its counters.
    pub async fn get_article(&self, id: &str) -> Result<Option<Article>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(article_from_row))
    }

    /// The `limit` most viewed articles.
    pub async fn most_viewed_articles(&self, limit: u32) -> Result<Vec<Article>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM articles ORDER BY views DESC, created_at DESC LIMIT ?",
            ARTICLE_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(article_from_row).collect())
    }

    /// Count one view of an article and return it with the new count.
    pub async fn record_view(&self, id: &str) -> Result<Article, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE articles SET views = views + 1 WHERE id = ? RETURNING {}",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(article_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))
    }

    /// Count one view of the article with `slug`.
    pub async fn record_view_by_slug(&self, slug: &str) -> Result<Article, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE articles SET views = views + 1 WHERE slug = ? RETURNING {}",
            ARTICLE_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(article_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Article with slug '{}' not found", slug)))
    }

    /// Insert an article and count it towards its category.
    pub async fn create_article(&self, article: &NewArticle) -> Result<Article, AppError> {
        let base_slug = slug::require_slug("Title", &article.title)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = now();

        // The unique index on slug still rejects a concurrent duplicate.
        let slug = {
            let mut conn = self.pool.acquire().await?;
            unique_slug(&mut *conn, &base_slug, None).await?
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO articles ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)",
            ARTICLE_COLUMNS
        ))
        .bind(&id)
        .bind(&article.category)
        .bind(&article.avatar.url)
        .bind(&article.avatar.asset_ref)
        .bind(&article.image.url)
        .bind(&article.image.asset_ref)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.code)
        .bind(&slug)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        adjust_category_count(&mut *tx, &article.category, 1).await?;

        tx.commit().await?;

        Ok(Article {
            id,
            category: article.category.clone(),
            avatar_url: article.avatar.url.clone(),
            avatar_asset_ref: article.avatar.asset_ref.clone(),
            image_url: article.image.url.clone(),
            image_asset_ref: article.image.asset_ref.clone(),
            title: article.title.clone(),
            description: article.description.clone(),
            code: article.code.clone(),
            slug,
            views: 0,
            likes: 0,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Apply a patch. The slug only changes when the title does.
    pub async fn update_article(
        &self,
        id: &str,
        patch: &ArticlePatch,
    ) -> Result<ArticleUpdate, AppError> {
        let now = now();
        let mut tx = self.pool.begin().await?;

        // Writing first takes SQLite's write lock before anything is read.
        let row = sqlx::query(&format!(
            "UPDATE articles SET updated_at = ? WHERE id = ? RETURNING {}",
            ARTICLE_COLUMNS
        ))
        .bind(&now)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let existing = row
            .as_ref()
            .map(article_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

        let title = patch.title.clone().unwrap_or_else(|| existing.title.clone());
        let slug = if title != existing.title {
            let base = slug::require_slug("Title", &title)?;
            if base == existing.slug {
                base
            } else {
                unique_slug(&mut *tx, &base, Some(id)).await?
            }
        } else {
            existing.slug.clone()
        };

        let category = patch
            .category
            .clone()
            .unwrap_or_else(|| existing.category.clone());
        if !category.eq_ignore_ascii_case(&existing.category) {
            adjust_category_count(&mut *tx, &existing.category, -1).await?;
            adjust_category_count(&mut *tx, &category, 1).await?;
        }

        let description = patch
            .description
            .clone()
            .unwrap_or_else(|| existing.description.clone());
        let code = patch.code.clone().unwrap_or_else(|| existing.code.clone());

        let mut replaced_assets = Vec::new();
        let (avatar_url, avatar_asset_ref) = match &patch.avatar {
            Some(avatar) => {
                replaced_assets.push(existing.avatar_asset_ref.clone());
                (avatar.url.clone(), avatar.asset_ref.clone())
            }
            None => (existing.avatar_url.clone(), existing.avatar_asset_ref.clone()),
        };
        let (image_url, image_asset_ref) = match &patch.image {
            Some(image) => {
                replaced_assets.push(existing.image_asset_ref.clone());
                (image.url.clone(), image.asset_ref.clone())
            }
            None => (existing.image_url.clone(), existing.image_asset_ref.clone()),
        };

        sqlx::query(
            r#"UPDATE articles SET
                category = ?, avatar_url = ?, avatar_asset_ref = ?, image_url = ?, image_asset_ref = ?,
                title = ?, description = ?, code = ?, slug = ?
            WHERE id = ?"#,
        )
        .bind(&category)
        .bind(&avatar_url)
        .bind(&avatar_asset_ref)
        .bind(&image_url)
        .bind(&image_asset_ref)
        .bind(&title)
        .bind(&description)
        .bind(&code)
        .bind(&slug)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ArticleUpdate {
            article: Article {
                category,
                avatar_url,
                avatar_asset_ref,
                image_url,
                image_asset_ref,
                title,
                description,
                code,
                slug,
                ..existing
            },
            replaced_assets,
        })
    }

    /// Delete an article together with its likes and comments, and uncount it
    /// from its category.
    pub async fn delete_article(&self, id: &str) -> Result<Article, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "DELETE FROM articles WHERE id = ? RETURNING {}",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let article = row
            .as_ref()
            .map(article_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

        let comments = sqlx::query("DELETE FROM comments WHERE article_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        adjust_category_count(&mut *tx, &article.category, -1).await?;

        tx.commit().await?;

        tracing::info!(
            "Deleted article {} ('{}') with {} comments",
            id,
            article.slug,
            comments
        );
        Ok(article)
    }

    // ==================== ENGAGEMENT ====================

    /// Add `identity` to an article's like set.
    ///
    /// Fails with `Conflict` if the identity already likes the article. Two
    /// concurrent likes by the same identity race on the membership primary
    /// key; exactly one of them inserts.
    pub async fn like_article(
        &self,
        id: &str,
        identity: &Identity,
    ) -> Result<LikeOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO article_likes (article_id, identity, created_at) SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM articles WHERE id = ?)",
        )
        .bind(id)
        .bind(identity.as_str())
        .bind(now())
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(missing_or_conflict(
                &mut *tx,
                id,
                "You have already liked this article",
            )
            .await);
        }

        let likes = recount_likes(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::debug!("Article {} liked by {} ({} likes)", id, identity, likes);
        Ok(LikeOutcome {
            article_id: id.to_string(),
            likes,
            liked: true,
        })
    }

    /// Remove `identity` from an article's like set.
    pub async fn unlike_article(
        &self,
        id: &str,
        identity: &Identity,
    ) -> Result<LikeOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM article_likes WHERE article_id = ? AND identity = ?")
            .bind(id)
            .bind(identity.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(missing_or_conflict(&mut *tx, id, "You have not liked this article").await);
        }

        let likes = recount_likes(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::debug!("Article {} unliked by {} ({} likes)", id, identity, likes);
        Ok(LikeOutcome {
            article_id: id.to_string(),
            likes,
            liked: false,
        })
    }

    /// Whether `identity` is in an article's like set.
    pub async fn like_status(&self, id: &str, identity: &Identity) -> Result<LikeStatus, AppError> {
        let row = sqlx::query(
            "SELECT likes, EXISTS(SELECT 1 FROM article_likes WHERE article_id = articles.id AND identity = ?) AS liked FROM articles WHERE id = ?",
        )
        .bind(identity.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

        Ok(LikeStatus {
            article_id: id.to_string(),
            liked: row.get("liked"),
            likes: row.get("likes"),
        })
    }

    pub async fn like_stats(&self, id: &str) -> Result<LikeStats, AppError> {
        let row = sqlx::query(
            "SELECT title, likes, (SELECT COUNT(*) FROM article_likes WHERE article_id = articles.id) AS unique_likers FROM articles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

        Ok(LikeStats {
            article_id: id.to_string(),
            title: row.get("title"),
            likes: row.get("likes"),
            unique_likers: row.get("unique_likers"),
        })
    }

    pub async fn view_stats(&self, id: &str) -> Result<ViewStats, AppError> {
        let row = sqlx::query("SELECT title, views FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

        Ok(ViewStats {
            article_id: id.to_string(),
            title: row.get("title"),
            views: row.get("views"),
        })
    }
}

fn push_article_filters<'a>(
    builder: &mut QueryBuilder<'a, Sqlite>,
    category: Option<&str>,
    search: Option<&str>,
) {
    builder.push(" WHERE 1 = 1");
    if let Some(category) = category {
        builder.push(" AND category = ");
        builder.push_bind(category.to_string());
        builder.push(" COLLATE NOCASE");
    }
    if let Some(search) = search {
        let pattern = format!("%{}%", escape_like(search));
        builder.push(" AND (title LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR description LIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\')");
    }
}

/// Escape LIKE wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// `base` if free, otherwise `base` plus a millisecond timestamp.
async fn unique_slug(
    conn: &mut SqliteConnection,
    base: &str,
    exclude_id: Option<&str>,
) -> Result<String, AppError> {
    let taken = |candidate: String| {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE slug = ? AND id != ?)",
        )
        .bind(candidate)
        .bind(exclude_id.unwrap_or("").to_string())
    };

    if !taken(base.to_string()).fetch_one(&mut *conn).await? {
        return Ok(base.to_string());
    }

    let candidate = slug::with_disambiguator(base, Utc::now().timestamp_millis());
    if taken(candidate.clone()).fetch_one(&mut *conn).await? {
        return Err(AppError::Conflict(format!(
            "An article with slug '{}' already exists",
            candidate
        )));
    }
    Ok(candidate)
}

async fn recount_likes(conn: &mut SqliteConnection, id: &str) -> Result<i64, AppError> {
    let likes: i64 = sqlx::query_scalar(
        "UPDATE articles SET likes = (SELECT COUNT(*) FROM article_likes WHERE article_id = ?) WHERE id = ? RETURNING likes",
    )
    .bind(id)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(likes)
}

/// Explain a like-set mutation that changed nothing.
async fn missing_or_conflict(conn: &mut SqliteConnection, id: &str, conflict: &str) -> AppError {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM articles WHERE id = ?)")
        .bind(id)
        .fetch_one(conn)
        .await;

    match exists {
        Ok(true) => AppError::Conflict(conflict.to_string()),
        Ok(false) => AppError::NotFound(format!("Article {} not found", id)),
        Err(e) => e.into(),
    }
}

fn article_from_row(row: &sqlx::sqlite::SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        category: row.get("category"),
        avatar_url: row.get("avatar_url"),
        avatar_asset_ref: row.get("avatar_asset_ref"),
        image_url: row.get("image_url"),
        image_asset_ref: row.get("image_asset_ref"),
        title: row.get("title"),
        description: row.get("description"),
        code: row.get("code"),
        slug: row.get("slug"),
        views: row.get("views"),
        likes: row.get("likes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("plain"), "plain");
    }
}
