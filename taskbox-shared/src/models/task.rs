//! Task model and database operations
//!
//! Tasks are the core entity: user-owned, optionally categorized, labeled
//! with any number of tags through the `task_tags` association table.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'ready');
//! CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
//!
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     title VARCHAR(128) NOT NULL,
//!     description VARCHAR(1024),
//!     status task_status NOT NULL DEFAULT 'todo',
//!     priority task_priority NOT NULL DEFAULT 'medium',
//!     due_date DATE,
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE task_tags (
//!     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
//!     tag_id UUID NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
//!     PRIMARY KEY (task_id, tag_id)
//! );
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::SortOrder;
use crate::auth::ownership::Owned;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    Todo,

    /// Being worked on
    InProgress,

    /// Done
    Ready,
}

impl TaskStatus {
    /// Gets status as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Ready => "ready",
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    /// Gets priority as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID (UUID v4)
    pub id: Uuid,

    /// Task title
    pub title: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Current status
    pub status: TaskStatus,

    /// Priority
    pub priority: TaskPriority,

    /// Optional due date
    pub due_date: Option<NaiveDate>,

    /// Owning user
    pub user_id: Uuid,

    /// Optional category (cleared when the category is deleted)
    pub category_id: Option<Uuid>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl Owned for Task {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Task {
    /// A task is overdue when its due date has passed and it is not done
    pub fn is_overdue(&self) -> bool {
        match self.due_date {
            Some(due) => due < Utc::now().date_naive() && self.status != TaskStatus::Ready,
            None => false,
        }
    }
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

/// Input for updating a task; only `Some` fields are written.
///
/// `description`, `due_date`, and `category_id` use a double Option so the
/// caller can distinguish "leave alone" (None) from "clear" (Some(None)).
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub category_id: Option<Option<Uuid>>,
}

/// Sortable task columns. Parsing from the query string goes through this
/// enum, so user input never reaches the ORDER BY clause as raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    DueDate,
    Priority,
    Status,
    Title,
}

impl TaskSortKey {
    /// Parses a query-string value; None for anything off the whitelist
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created_at" => Some(TaskSortKey::CreatedAt),
            "updated_at" => Some(TaskSortKey::UpdatedAt),
            "due_date" => Some(TaskSortKey::DueDate),
            "priority" => Some(TaskSortKey::Priority),
            "status" => Some(TaskSortKey::Status),
            "title" => Some(TaskSortKey::Title),
            _ => None,
        }
    }

    /// Column name for the ORDER BY clause
    pub fn column(&self) -> &'static str {
        match self {
            TaskSortKey::CreatedAt => "created_at",
            TaskSortKey::UpdatedAt => "updated_at",
            TaskSortKey::DueDate => "due_date",
            TaskSortKey::Priority => "priority",
            TaskSortKey::Status => "status",
            TaskSortKey::Title => "title",
        }
    }
}

/// Search filters for [`Task::search`]; every filter is optional and
/// filters combine with AND
#[derive(Debug, Clone, Default)]
pub struct TaskSearch {
    /// Case-insensitive substring match on title
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category_id: Option<Uuid>,
    /// Tasks carrying any of these tags
    pub tag_ids: Option<Vec<Uuid>>,
    /// true: overdue only; false: not-overdue only
    pub is_overdue: Option<bool>,
    pub due_date_from: Option<NaiveDate>,
    pub due_date_to: Option<NaiveDate>,
    pub sort_by: TaskSortKey,
    pub sort_order: SortOrder,
}

/// Per-user task statistics
#[derive(Debug, Clone, Serialize)]
pub struct TaskStats {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub overdue_tasks: i64,
    pub due_today: i64,
    pub completion_rate: f64,
}

const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, user_id, \
                            category_id, created_at, updated_at";

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (user_id, title, description, status, priority, due_date, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(data.user_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.category_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Updates a task; only `Some` fields in `data` are written
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if data.category_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", category_id = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(category_id) = data.category_id {
            q = q.bind(category_id);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task; its tag associations cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists a user's tasks ordered by creation date, newest first
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Counts a user's tasks
    pub async fn count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Searches a user's tasks with combined filters, sorting, and
    /// pagination. Returns the matching page and the total match count.
    ///
    /// The WHERE clause is assembled from fixed fragments with numbered
    /// placeholders; user input only ever travels through binds, and the
    /// sort column comes from the [`TaskSortKey`] whitelist.
    pub async fn search(
        pool: &PgPool,
        user_id: Uuid,
        search: &TaskSearch,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let mut clauses = String::from("WHERE user_id = $1");
        let mut bind_count = 1;

        if search.title.is_some() {
            bind_count += 1;
            clauses.push_str(&format!(" AND title ILIKE ${}", bind_count));
        }
        if search.status.is_some() {
            bind_count += 1;
            clauses.push_str(&format!(" AND status = ${}", bind_count));
        }
        if search.priority.is_some() {
            bind_count += 1;
            clauses.push_str(&format!(" AND priority = ${}", bind_count));
        }
        if search.category_id.is_some() {
            bind_count += 1;
            clauses.push_str(&format!(" AND category_id = ${}", bind_count));
        }
        if search.tag_ids.is_some() {
            bind_count += 1;
            clauses.push_str(&format!(
                " AND id IN (SELECT task_id FROM task_tags WHERE tag_id = ANY(${}))",
                bind_count
            ));
        }
        match search.is_overdue {
            Some(true) => {
                clauses.push_str(" AND due_date IS NOT NULL AND due_date < CURRENT_DATE");
            }
            Some(false) => {
                clauses.push_str(" AND (due_date IS NULL OR due_date >= CURRENT_DATE)");
            }
            None => {}
        }
        if search.due_date_from.is_some() {
            bind_count += 1;
            clauses.push_str(&format!(" AND due_date >= ${}", bind_count));
        }
        if search.due_date_to.is_some() {
            bind_count += 1;
            clauses.push_str(&format!(" AND due_date <= ${}", bind_count));
        }

        // Total count with the same filters
        let count_sql = format!("SELECT COUNT(*) FROM tasks {clauses}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql).bind(user_id);

        if let Some(ref title) = search.title {
            count_q = count_q.bind(format!("%{}%", title));
        }
        if let Some(status) = search.status {
            count_q = count_q.bind(status);
        }
        if let Some(priority) = search.priority {
            count_q = count_q.bind(priority);
        }
        if let Some(category_id) = search.category_id {
            count_q = count_q.bind(category_id);
        }
        if let Some(ref tag_ids) = search.tag_ids {
            count_q = count_q.bind(tag_ids.clone());
        }
        if let Some(from) = search.due_date_from {
            count_q = count_q.bind(from);
        }
        if let Some(to) = search.due_date_to {
            count_q = count_q.bind(to);
        }

        let total = count_q.fetch_one(pool).await?;

        // Matching page
        let page_sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks {clauses} ORDER BY {} {} LIMIT ${} OFFSET ${}",
            search.sort_by.column(),
            search.sort_order.as_sql(),
            bind_count + 1,
            bind_count + 2,
        );
        let mut page_q = sqlx::query_as::<_, Task>(&page_sql).bind(user_id);

        if let Some(ref title) = search.title {
            page_q = page_q.bind(format!("%{}%", title));
        }
        if let Some(status) = search.status {
            page_q = page_q.bind(status);
        }
        if let Some(priority) = search.priority {
            page_q = page_q.bind(priority);
        }
        if let Some(category_id) = search.category_id {
            page_q = page_q.bind(category_id);
        }
        if let Some(ref tag_ids) = search.tag_ids {
            page_q = page_q.bind(tag_ids.clone());
        }
        if let Some(from) = search.due_date_from {
            page_q = page_q.bind(from);
        }
        if let Some(to) = search.due_date_to {
            page_q = page_q.bind(to);
        }

        let tasks = page_q.bind(limit).bind(offset).fetch_all(pool).await?;

        Ok((tasks, total))
    }

    /// Associates a tag with a task.
    ///
    /// Returns false when the association already existed. Ownership of
    /// both rows is the caller's responsibility.
    pub async fn attach_tag(pool: &PgPool, task_id: Uuid, tag_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(task_id)
        .bind(tag_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a tag association; returns false when it did not exist
    pub async fn detach_tag(pool: &PgPool, task_id: Uuid, tag_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_tags WHERE task_id = $1 AND tag_id = $2")
            .bind(task_id)
            .bind(tag_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces a task's tag set wholesale
    pub async fn replace_tags(
        pool: &PgPool,
        task_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM task_tags WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        for tag_id in tag_ids {
            sqlx::query(
                "INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(task_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Computes per-user task statistics in one pass
    pub async fn stats(pool: &PgPool, user_id: Uuid) -> Result<TaskStats, sqlx::Error> {
        let (total, completed, overdue, due_today): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'ready'),
                   COUNT(*) FILTER (WHERE due_date < CURRENT_DATE AND status <> 'ready'),
                   COUNT(*) FILTER (WHERE due_date = CURRENT_DATE)
            FROM tasks
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        let completion_rate = if total > 0 {
            (completed as f64 / total as f64 * 10000.0).round() / 100.0
        } else {
            100.0
        };

        Ok(TaskStats {
            total_tasks: total,
            completed_tasks: completed,
            overdue_tasks: overdue,
            due_today,
            completion_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task_with_due(due_date: Option<NaiveDate>, status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            due_date,
            user_id: Uuid::new_v4(),
            category_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"todo\"").unwrap(),
            TaskStatus::Todo
        );
    }

    #[test]
    fn test_priority_serde() {
        assert_eq!(serde_json::to_string(&TaskPriority::High).unwrap(), "\"high\"");
    }

    #[test]
    fn test_is_overdue() {
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let tomorrow = Utc::now().date_naive() + Duration::days(1);

        assert!(task_with_due(Some(yesterday), TaskStatus::Todo).is_overdue());
        assert!(!task_with_due(Some(tomorrow), TaskStatus::Todo).is_overdue());
        assert!(!task_with_due(None, TaskStatus::Todo).is_overdue());
        // A finished task is never overdue
        assert!(!task_with_due(Some(yesterday), TaskStatus::Ready).is_overdue());
    }

    #[test]
    fn test_sort_key_whitelist() {
        assert_eq!(TaskSortKey::parse("due_date"), Some(TaskSortKey::DueDate));
        assert_eq!(TaskSortKey::parse("title"), Some(TaskSortKey::Title));

        // Anything else stays out of the ORDER BY clause
        assert_eq!(TaskSortKey::parse("id; DROP TABLE tasks"), None);
        assert_eq!(TaskSortKey::parse("user_id"), None);
        assert_eq!(TaskSortKey::parse(""), None);
    }

    #[test]
    fn test_sort_key_columns() {
        assert_eq!(TaskSortKey::CreatedAt.column(), "created_at");
        assert_eq!(TaskSortKey::Priority.column(), "priority");
    }

    #[test]
    fn test_owned_impl() {
        let task = task_with_due(None, TaskStatus::Todo);
        assert_eq!(task.owner_id(), task.user_id);
    }

    #[test]
    fn test_search_defaults() {
        let search = TaskSearch::default();
        assert_eq!(search.sort_by, TaskSortKey::CreatedAt);
        assert_eq!(search.sort_order, SortOrder::Desc);
        assert!(search.title.is_none());
    }
}
