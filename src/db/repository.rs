//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Article and
//! engagement operations live in `db::articles`.

use chrono::{SecondsFormat, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{Category, Comment, NewComment, Project, SeedProject};
use crate::slug;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(crate) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Round-trip to the store, used by the health check.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ==================== CATEGORY OPERATIONS ====================

    /// List all categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, slug, description, article_count, created_at, updated_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, slug, description, article_count, created_at, updated_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// Get a category by slug.
    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, slug, description, article_count, created_at, updated_at FROM categories WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// Create a new category. Names are unique ignoring case.
    pub async fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, AppError> {
        let slug = slug::require_slug("Category name", name)?;
        self.ensure_category_name_free(name, &slug, None).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = now();

        sqlx::query(
            "INSERT INTO categories (id, name, slug, description, article_count, created_at, updated_at) VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(&slug)
        .bind(description)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        // Articles may already carry this label.
        let article_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE category = ? COLLATE NOCASE")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        if article_count > 0 {
            sqlx::query("UPDATE categories SET article_count = ? WHERE id = ?")
                .bind(article_count)
                .bind(&id)
                .execute(&self.pool)
                .await?;
        }

        Ok(Category {
            id,
            name: name.to_string(),
            slug,
            description: description.map(str::to_string),
            article_count,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Update a category. A rename recomputes the slug and relabels its articles.
    pub async fn update_category(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Category, AppError> {
        let existing = self
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        let renamed = name.filter(|n| *n != existing.name);
        let slug = match renamed {
            Some(new_name) => {
                let slug = slug::require_slug("Category name", new_name)?;
                self.ensure_category_name_free(new_name, &slug, Some(id))
                    .await?;
                slug
            }
            None => existing.slug.clone(),
        };
        let new_name = renamed.unwrap_or(&existing.name).to_string();
        let description = match description {
            Some(d) if d.is_empty() => None,
            Some(d) => Some(d.to_string()),
            None => existing.description.clone(),
        };
        let now = now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE categories SET name = ?, slug = ?, description = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&new_name)
        .bind(&slug)
        .bind(&description)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if renamed.is_some() {
            let relabelled = sqlx::query(
                "UPDATE articles SET category = ? WHERE category = ? COLLATE NOCASE",
            )
            .bind(&new_name)
            .bind(&existing.name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            tracing::info!(
                "Renamed category '{}' to '{}', relabelled {} articles",
                existing.name,
                new_name,
                relabelled
            );
        }

        tx.commit().await?;

        Ok(Category {
            name: new_name,
            slug,
            description,
            updated_at: now,
            ..existing
        })
    }

    /// Delete a category. Articles keep their label.
    pub async fn delete_category(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }

        Ok(())
    }

    async fn ensure_category_name_free(
        &self,
        name: &str,
        slug: &str,
        exclude_id: Option<&str>,
    ) -> Result<(), AppError> {
        let clash: Option<String> = sqlx::query_scalar(
            "SELECT name FROM categories WHERE (name = ? OR slug = ?) AND id != ? LIMIT 1",
        )
        .bind(name)
        .bind(slug)
        .bind(exclude_id.unwrap_or(""))
        .fetch_optional(&self.pool)
        .await?;

        match clash {
            Some(existing) => Err(AppError::Conflict(format!(
                "Category '{}' already exists",
                existing
            ))),
            None => Ok(()),
        }
    }

    // ==================== COMMENT OPERATIONS ====================

    /// List an article's comments, newest first.
    pub async fn list_comments(&self, article_id: &str) -> Result<Vec<Comment>, AppError> {
        if !self.article_exists(article_id).await? {
            return Err(AppError::NotFound(format!("Article {} not found", article_id)));
        }

        let rows = sqlx::query(
            "SELECT id, article_id, user, text, likes, created_at FROM comments WHERE article_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    /// Post a comment on an existing article.
    pub async fn create_comment(&self, comment: &NewComment) -> Result<Comment, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now();

        let result = sqlx::query(
            "INSERT INTO comments (id, article_id, user, text, likes, created_at) SELECT ?, ?, ?, ?, 0, ? WHERE EXISTS (SELECT 1 FROM articles WHERE id = ?)",
        )
        .bind(&id)
        .bind(&comment.article_id)
        .bind(&comment.user)
        .bind(&comment.text)
        .bind(&now)
        .bind(&comment.article_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Article {} not found",
                comment.article_id
            )));
        }

        Ok(Comment {
            id,
            article_id: comment.article_id.clone(),
            user: comment.user.clone(),
            text: comment.text.clone(),
            likes: 0,
            created_at: now,
        })
    }

    /// Increment a comment's like counter.
    pub async fn like_comment(&self, id: &str) -> Result<Comment, AppError> {
        let row = sqlx::query(
            "UPDATE comments SET likes = likes + 1 WHERE id = ? RETURNING id, article_id, user, text, likes, created_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(comment_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
    }

    /// Delete a comment.
    pub async fn delete_comment(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }

        Ok(())
    }

    // ==================== PROJECT OPERATIONS ====================

    /// List projects, optionally restricted to one category (case-insensitive).
    pub async fn list_projects(&self, category: Option<&str>) -> Result<Vec<Project>, AppError> {
        let rows = match category {
            Some(category) => {
                sqlx::query(
                    "SELECT id, title, description, full_description, image_url, category, technologies, github, demo, created_at, updated_at FROM projects WHERE category = ? COLLATE NOCASE ORDER BY created_at DESC, id DESC",
                )
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, title, description, full_description, image_url, category, technologies, github, demo, created_at, updated_at FROM projects ORDER BY created_at DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(project_from_row).collect())
    }

    /// Get a project by ID.
    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, AppError> {
        let row = sqlx::query(
            "SELECT id, title, description, full_description, image_url, category, technologies, github, demo, created_at, updated_at FROM projects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(project_from_row))
    }

    /// Load seed projects into an empty projects table. Returns how many were inserted.
    pub async fn seed_projects(&self, projects: &[SeedProject]) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        for project in projects {
            let now = now();
            let technologies = serde_json::to_string(&project.technologies)?;
            sqlx::query(
                "INSERT INTO projects (id, title, description, full_description, image_url, category, technologies, github, demo, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&project.title)
            .bind(&project.description)
            .bind(&project.full_description)
            .bind(&project.image_url)
            .bind(&project.category)
            .bind(&technologies)
            .bind(&project.github)
            .bind(&project.demo)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(projects.len())
    }
}

/// Current time in the fixed-width RFC 3339 form stored in every timestamp column.
pub(super) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Shift a category's article count by `delta`, never below zero.
///
/// Articles whose label matches no category are left alone.
pub(super) async fn adjust_category_count(
    conn: &mut SqliteConnection,
    category: &str,
    delta: i64,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE categories SET article_count = MAX(article_count + ?, 0) WHERE name = ?",
    )
    .bind(delta)
    .bind(category)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        tracing::debug!("No category named '{}' to adjust", category);
    }
    Ok(())
}

// Helper functions for row conversion

fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        article_count: row.get("article_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        article_id: row.get("article_id"),
        user: row.get("user"),
        text: row.get("text"),
        likes: row.get("likes"),
        created_at: row.get("created_at"),
    }
}

fn project_from_row(row: &sqlx::sqlite::SqliteRow) -> Project {
    let technologies: String = row.get("technologies");
    Project {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        full_description: row.get("full_description"),
        image_url: row.get("image_url"),
        category: row.get("category"),
        technologies: parse_json_array(&technologies),
        github: row.get("github"),
        demo: row.get("demo"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
