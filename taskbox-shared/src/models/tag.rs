//! Tag model and database operations
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tags (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(64) NOT NULL,
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! Deleting a tag removes it from every task through the `task_tags`
//! cascade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::SortOrder;
use crate::auth::ownership::Owned;

/// Tag model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// Unique tag ID (UUID v4)
    pub id: Uuid,

    /// Tag name
    pub name: String,

    /// Owning user
    pub user_id: Uuid,

    /// When the tag was created
    pub created_at: DateTime<Utc>,

    /// When the tag was last updated
    pub updated_at: DateTime<Utc>,
}

impl Owned for Tag {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// Input for creating a new tag
#[derive(Debug, Clone)]
pub struct CreateTag {
    pub user_id: Uuid,
    pub name: String,
}

/// Sortable tag columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSortKey {
    #[default]
    Name,
    CreatedAt,
    UpdatedAt,
}

impl TagSortKey {
    /// Parses a query-string value; None for anything off the whitelist
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(TagSortKey::Name),
            "created_at" => Some(TagSortKey::CreatedAt),
            "updated_at" => Some(TagSortKey::UpdatedAt),
            _ => None,
        }
    }

    /// Column name for the ORDER BY clause
    pub fn column(&self) -> &'static str {
        match self {
            TagSortKey::Name => "name",
            TagSortKey::CreatedAt => "created_at",
            TagSortKey::UpdatedAt => "updated_at",
        }
    }
}

/// Tag plus its usage count, for the stats endpoint
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TagStats {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub task_count: i64,
}

const TAG_COLUMNS: &str = "id, name, user_id, created_at, updated_at";

impl Tag {
    /// Creates a new tag
    pub async fn create(pool: &PgPool, data: CreateTag) -> Result<Self, sqlx::Error> {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            r#"
            INSERT INTO tags (user_id, name)
            VALUES ($1, $2)
            RETURNING {TAG_COLUMNS}
            "#,
        ))
        .bind(data.user_id)
        .bind(data.name)
        .fetch_one(pool)
        .await?;

        Ok(tag)
    }

    /// Finds a tag by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(tag)
    }

    /// Renames a tag; returns None if the ID does not exist
    pub async fn rename(pool: &PgPool, id: Uuid, name: String) -> Result<Option<Self>, sqlx::Error> {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "UPDATE tags SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {TAG_COLUMNS}",
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(tag)
    }

    /// Deletes a tag and its task associations
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists a user's tags with sorting and pagination
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        sort_by: TagSortKey,
        sort_order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tags = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE user_id = $1 \
             ORDER BY {} {} LIMIT $2 OFFSET $3",
            sort_by.column(),
            sort_order.as_sql(),
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    /// Counts a user's tags
    pub async fn count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Names of the tags attached to a task, alphabetical
    pub async fn names_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT t.name
            FROM tags t
            JOIN task_tags tt ON tt.tag_id = t.id
            WHERE tt.task_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(names)
    }

    /// Usage counters for a user's tags, most-used first
    pub async fn stats(pool: &PgPool, user_id: Uuid) -> Result<Vec<TagStats>, sqlx::Error> {
        let stats = sqlx::query_as::<_, TagStats>(
            r#"
            SELECT t.id, t.name, t.user_id, t.created_at, t.updated_at,
                   COUNT(tt.task_id) AS task_count
            FROM tags t
            LEFT JOIN task_tags tt ON tt.tag_id = t.id
            WHERE t.user_id = $1
            GROUP BY t.id
            ORDER BY task_count DESC, t.name ASC
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
        assert_eq!(TagSortKey::parse("name"), Some(TagSortKey::Name));
        assert_eq!(TagSortKey::parse("updated_at"), Some(TagSortKey::UpdatedAt));
        assert_eq!(TagSortKey::parse("task_count"), None);
        assert_eq!(TagSortKey::parse("name DESC; --"), None);
    }

    #[test]
    fn test_owned_impl() {
        let user_id = Uuid::new_v4();
        let tag = Tag {
            id: Uuid::new_v4(),
            name: "urgent".to_string(),
            user_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(tag.owner_id(), user_id);
    }
}
