//! Category model and database operations
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE categories (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(64) NOT NULL,
//!     description VARCHAR(256),
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! Deleting a category does not delete its tasks; their `category_id`
//! reverts to NULL via the FK's ON DELETE SET NULL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::SortOrder;
use crate::auth::ownership::Owned;

/// Category model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    /// Unique category ID (UUID v4)
    pub id: Uuid,

    /// Category name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Owning user
    pub user_id: Uuid,

    /// When the category was created
    pub created_at: DateTime<Utc>,

    /// When the category was last updated
    pub updated_at: DateTime<Utc>,
}

impl Owned for Category {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// Input for creating a new category
#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Input for updating a category; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

/// Sortable category columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySortKey {
    #[default]
    Name,
    CreatedAt,
    UpdatedAt,
}

impl CategorySortKey {
    /// Parses a query-string value; None for anything off the whitelist
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(CategorySortKey::Name),
            "created_at" => Some(CategorySortKey::CreatedAt),
            "updated_at" => Some(CategorySortKey::UpdatedAt),
            _ => None,
        }
    }

    /// Column name for the ORDER BY clause
    pub fn column(&self) -> &'static str {
        match self {
            CategorySortKey::Name => "name",
            CategorySortKey::CreatedAt => "created_at",
            CategorySortKey::UpdatedAt => "updated_at",
        }
    }
}

/// Category plus aggregate task counters, for the stats endpoint
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryStats {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub task_count: i64,
    pub completed_count: i64,
    pub overdue_count: i64,
}

impl CategoryStats {
    /// Share of tasks in this category that are done, in percent
    pub fn completion_rate(&self) -> f64 {
        if self.task_count == 0 {
            return 100.0;
        }
        (self.completed_count as f64 / self.task_count as f64 * 10000.0).round() / 100.0
    }
}

const CATEGORY_COLUMNS: &str = "id, name, description, user_id, created_at, updated_at";

impl Category {
    /// Creates a new category
    pub async fn create(pool: &PgPool, data: CreateCategory) -> Result<Self, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (user_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING {CATEGORY_COLUMNS}
            "#,
        ))
        .bind(data.user_id)
        .bind(data.name)
        .bind(data.description)
        .fetch_one(pool)
        .await?;

        Ok(category)
    }

    /// Finds a category by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    /// Updates a category; only `Some` fields in `data` are written
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCategory,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE categories SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Category>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }

        let category = q.fetch_optional(pool).await?;

        Ok(category)
    }

    /// Deletes a category; tasks referencing it fall back to uncategorized
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists a user's categories with sorting and pagination
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        sort_by: CategorySortKey,
        sort_order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE user_id = $1 \
             ORDER BY {} {} LIMIT $2 OFFSET $3",
            sort_by.column(),
            sort_order.as_sql(),
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(categories)
    }

    /// Counts a user's categories
    pub async fn count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Per-category task counters for a user, one aggregate query.
    ///
    /// A task counts as completed when `status = 'ready'` and as overdue
    /// when its due date has passed and it is not done.
    pub async fn stats(pool: &PgPool, user_id: Uuid) -> Result<Vec<CategoryStats>, sqlx::Error> {
        let stats = sqlx::query_as::<_, CategoryStats>(
            r#"
            SELECT c.id, c.name, c.description, c.user_id, c.created_at, c.updated_at,
                   COUNT(t.id) AS task_count,
                   COUNT(t.id) FILTER (WHERE t.status = 'ready') AS completed_count,
                   COUNT(t.id) FILTER (
                       WHERE t.due_date < CURRENT_DATE AND t.status <> 'ready'
                   ) AS overdue_count
            FROM categories c
            LEFT JOIN tasks t ON t.category_id = c.id
            WHERE c.user_id = $1
            GROUP BY c.id
            ORDER BY c.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_whitelist() {
        assert_eq!(CategorySortKey::parse("name"), Some(CategorySortKey::Name));
        assert_eq!(CategorySortKey::parse("created_at"), Some(CategorySortKey::CreatedAt));
        assert_eq!(CategorySortKey::parse("description"), None);
        assert_eq!(CategorySortKey::parse("name; --"), None);
    }

    #[test]
    fn test_completion_rate() {
        let mut stats = CategoryStats {
            id: Uuid::new_v4(),
            name: "Work".to_string(),
            description: None,
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            task_count: 8,
            completed_count: 2,
            overdue_count: 1,
        };

        assert_eq!(stats.completion_rate(), 25.0);

        // Empty categories read as fully complete
        stats.task_count = 0;
        stats.completed_count = 0;
        assert_eq!(stats.completion_rate(), 100.0);
    }

    #[test]
    fn test_completion_rate_rounding() {
        let stats = CategoryStats {
            id: Uuid::new_v4(),
            name: "Errands".to_string(),
            description: None,
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            task_count: 3,
            completed_count: 1,
            overdue_count: 0,
        };

        assert_eq!(stats.completion_rate(), 33.33);
    }
}
