//! Task endpoints
//!
//! Every by-id operation fetches the row, then runs the ownership guard
//! before touching it; a task belonging to someone else is indistinguishable
//! from a task that does not exist.
//!
//! # Endpoints
//!
//! - `POST /api/v1/tasks` - create
//! - `GET /api/v1/tasks` - list (paginated)
//! - `GET /api/v1/tasks/search` - filtered search
//! - `GET /api/v1/tasks/stats` - per-user statistics
//! - `GET|PUT|DELETE /api/v1/tasks/:id`
//! - `POST|DELETE /api/v1/tasks/:id/tags/:tag_id` - attach/detach a tag

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{ApiResponse, PageQuery, PaginatedResponse, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use taskbox_shared::{
    auth::{middleware::AuthContext, ownership::ensure_owner},
    models::{
        category::Category,
        tag::Tag,
        task::{CreateTask, Task, TaskPriority, TaskSearch, TaskSortKey, TaskStatus, TaskStats, UpdateTask},
        SortOrder,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Task title
    #[validate(length(min = 1, max = 128, message = "Title must be 1 to 128 characters"))]
    pub title: String,

    /// Optional description
    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: Option<String>,

    /// Status (default `todo`)
    pub status: Option<TaskStatus>,

    /// Priority (default `medium`)
    pub priority: Option<TaskPriority>,

    /// Due date, `YYYY-MM-DD`
    pub due_date: Option<NaiveDate>,

    /// Category to file the task under (must belong to the acting user)
    pub category_id: Option<Uuid>,

    /// Tags to attach (tags that don't resolve to the acting user are skipped)
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

/// Update request. Absent fields are left alone; explicit nulls clear
/// `description`, `due_date`, and `category_id`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 128, message = "Title must be 1 to 128 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "super::deserialize_explicit_null")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "super::deserialize_explicit_null")]
    pub due_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "super::deserialize_explicit_null")]
    pub category_id: Option<Option<Uuid>>,

    /// Replaces the full tag set when present
    pub tag_ids: Option<Vec<Uuid>>,
}

/// Search query parameters. `tag_ids` is a comma-separated UUID list;
/// `sort_by` must name a whitelisted column.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category_id: Option<Uuid>,
    pub tag_ids: Option<String>,
    pub is_overdue: Option<bool>,
    pub due_date_from: Option<NaiveDate>,
    pub due_date_to: Option<NaiveDate>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Task representation returned by every task endpoint
#[derive(Debug, Serialize)]
pub struct TaskBody {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    /// Category name, when the task is categorized
    pub category: Option<String>,
    /// Names of attached tags, alphabetical
    pub tags: Vec<String>,
    pub is_overdue: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Builds the response body for one task (resolves category and tag names)
async fn task_body(state: &AppState, task: Task) -> ApiResult<TaskBody> {
    let category = match task.category_id {
        Some(category_id) => Category::find_by_id(&state.db, category_id)
            .await?
            .map(|c| c.name),
        None => None,
    };

    let tags = Tag::names_for_task(&state.db, task.id).await?;

    Ok(TaskBody {
        is_overdue: task.is_overdue(),
        id: task.id,
        title: task.title,
        description: task.description,
        status: task.status,
        priority: task.priority,
        due_date: task.due_date,
        user_id: task.user_id,
        category_id: task.category_id,
        category,
        tags,
        created_at: task.created_at,
        updated_at: task.updated_at,
    })
}

async fn task_bodies(state: &AppState, tasks: Vec<Task>) -> ApiResult<Vec<TaskBody>> {
    let mut bodies = Vec::with_capacity(tasks.len());
    for task in tasks {
        bodies.push(task_body(state, task).await?);
    }
    Ok(bodies)
}

/// Fetches a task and enforces ownership; a miss and a foreign row are the
/// same 404
async fn owned_task(state: &AppState, auth: &AuthContext, task_id: Uuid) -> ApiResult<Task> {
    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    ensure_owner(auth, &task, state.admin_override())
        .map_err(|_| ApiError::NotFound("Task not found".to_string()))?;

    Ok(task)
}

/// Resolves a category id to one the acting user owns
async fn owned_category(state: &AppState, auth: &AuthContext, category_id: Uuid) -> ApiResult<Category> {
    let category = Category::find_by_id(&state.db, category_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    ensure_owner(auth, &category, state.admin_override())
        .map_err(|_| ApiError::NotFound("Category not found".to_string()))?;

    Ok(category)
}

/// Filters `tag_ids` down to tags the acting user owns
async fn owned_tag_ids(
    state: &AppState,
    auth: &AuthContext,
    tag_ids: &[Uuid],
) -> ApiResult<Vec<Uuid>> {
    let mut owned = Vec::with_capacity(tag_ids.len());
    for &tag_id in tag_ids {
        if let Some(tag) = Tag::find_by_id(&state.db, tag_id).await? {
            if ensure_owner(auth, &tag, state.admin_override()).is_ok() {
                owned.push(tag.id);
            }
        }
    }
    Ok(owned)
}

/// Create a new task
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TaskBody>>)> {
    req.validate().map_err(ApiError::from_validation)?;

    if let Some(category_id) = req.category_id {
        owned_category(&state, &auth, category_id).await?;
    }

    let task = Task::create(
        &state.db,
        CreateTask {
            user_id: auth.user_id,
            title: req.title,
            description: req.description,
            status: req.status.unwrap_or(TaskStatus::Todo),
            priority: req.priority.unwrap_or(TaskPriority::Medium),
            due_date: req.due_date,
            category_id: req.category_id,
        },
    )
    .await?;

    for tag_id in owned_tag_ids(&state, &auth, &req.tag_ids).await? {
        Task::attach_tag(&state.db, task.id, tag_id).await?;
    }

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "task created");

    let body = task_body(&state, task).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Task created successfully", body)),
    ))
}

/// List the current user's tasks, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResponse<TaskBody>>> {
    let pagination = Pagination::from_query(&query);

    let tasks = Task::list(
        &state.db,
        auth.user_id,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    let total = Task::count(&state.db, auth.user_id).await?;

    Ok(Json(PaginatedResponse::new(
        task_bodies(&state, tasks).await?,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Search the current user's tasks with combined filters
pub async fn search_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<PaginatedResponse<TaskBody>>> {
    let sort_by = match query.sort_by.as_deref() {
        Some(raw) => TaskSortKey::parse(raw)
            .ok_or_else(|| ApiError::invalid_field("sort_by", format!("Unknown sort field: {}", raw)))?,
        None => TaskSortKey::default(),
    };

    let sort_order = match query.sort_order.as_deref() {
        Some(raw) => SortOrder::parse(raw)
            .ok_or_else(|| ApiError::invalid_field("sort_order", "Must be 'asc' or 'desc'"))?,
        None => SortOrder::Desc,
    };

    let tag_ids = match query.tag_ids.as_deref() {
        Some(raw) => {
            let parsed: Result<Vec<Uuid>, _> =
                raw.split(',').map(|s| s.trim().parse::<Uuid>()).collect();
            Some(parsed.map_err(|_| {
                ApiError::invalid_field("tag_ids", "Must be a comma-separated list of UUIDs")
            })?)
        }
        None => None,
    };

    if let (Some(from), Some(to)) = (query.due_date_from, query.due_date_to) {
        if to < from {
            return Err(ApiError::invalid_field(
                "due_date_to",
                "due_date_to must be after due_date_from",
            ));
        }
    }

    let pagination = Pagination::from_query(&PageQuery {
        page: query.page,
        per_page: query.per_page,
    });

    let search = TaskSearch {
        title: query.title,
        status: query.status,
        priority: query.priority,
        category_id: query.category_id,
        tag_ids,
        is_overdue: query.is_overdue,
        due_date_from: query.due_date_from,
        due_date_to: query.due_date_to,
        sort_by,
        sort_order,
    };

    let (tasks, total) = Task::search(
        &state.db,
        auth.user_id,
        &search,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok(Json(PaginatedResponse::new(
        task_bodies(&state, tasks).await?,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Task statistics for the current user
pub async fn task_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<TaskStats>>> {
    let stats = Task::stats(&state.db, auth.user_id).await?;

    Ok(Json(ApiResponse::new(stats)))
}

/// Get a specific task by ID
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<TaskBody>>> {
    let task = owned_task(&state, &auth, task_id).await?;
    let body = task_body(&state, task).await?;

    Ok(Json(ApiResponse::new(body)))
}

/// Update a specific task by ID
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<ApiResponse<TaskBody>>> {
    req.validate().map_err(ApiError::from_validation)?;

    let task = owned_task(&state, &auth, task_id).await?;

    if let Some(ref description) = req.description {
        if let Some(d) = description {
            if d.chars().count() > 1024 {
                return Err(ApiError::invalid_field(
                    "description",
                    "Description must be at most 1024 characters",
                ));
            }
        }
    }

    // A new category must belong to the acting user
    if let Some(Some(category_id)) = req.category_id {
        owned_category(&state, &auth, category_id).await?;
    }

    let updated = Task::update(
        &state.db,
        task.id,
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            category_id: req.category_id,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if let Some(ref tag_ids) = req.tag_ids {
        let owned = owned_tag_ids(&state, &auth, tag_ids).await?;
        Task::replace_tags(&state.db, updated.id, &owned).await?;
    }

    tracing::info!(task_id = %updated.id, user_id = %auth.user_id, "task updated");

    let body = task_body(&state, updated).await?;

    Ok(Json(ApiResponse::with_message(
        "Task updated successfully",
        body,
    )))
}

/// Delete a specific task by ID
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let task = owned_task(&state, &auth, task_id).await?;

    Task::delete(&state.db, task.id).await?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "task deleted");

    Ok(Json(ApiResponse::with_message(
        "Task deleted successfully",
        (),
    )))
}

/// Attach a tag to a task
pub async fn attach_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((task_id, tag_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let task = owned_task(&state, &auth, task_id).await?;

    let tag = Tag::find_by_id(&state.db, tag_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;
    ensure_owner(&auth, &tag, state.admin_override())
        .map_err(|_| ApiError::NotFound("Tag not found".to_string()))?;

    Task::attach_tag(&state.db, task.id, tag.id).await?;

    Ok(Json(ApiResponse::with_message(
        "Tag added to task successfully",
        (),
    )))
}

/// Remove a tag from a task
pub async fn detach_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((task_id, tag_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let task = owned_task(&state, &auth, task_id).await?;

    let tag = Tag::find_by_id(&state.db, tag_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;
    ensure_owner(&auth, &tag, state.admin_override())
        .map_err(|_| ApiError::NotFound("Tag not found".to_string()))?;

    Task::detach_tag(&state.db, task.id, tag.id).await?;

    Ok(Json(ApiResponse::with_message(
        "Tag removed from task successfully",
        (),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        // Absent: leave due_date alone
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert!(req.due_date.is_none());
        assert!(req.category_id.is_none());

        // Explicit null: clear it
        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"due_date": null, "category_id": null}"#).unwrap();
        assert_eq!(req.due_date, Some(None));
        assert_eq!(req.category_id, Some(None));

        // Value: set it
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"due_date": "2025-06-01"}"#).unwrap();
        assert_eq!(
            req.due_date,
            Some(Some(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()))
        );
    }

    #[test]
    fn test_create_request_enum_parsing() {
        let req: CreateTaskRequest = serde_json::from_str(
            r#"{"title": "Ship it", "status": "in_progress", "priority": "high"}"#,
        )
        .unwrap();

        assert_eq!(req.status, Some(TaskStatus::InProgress));
        assert_eq!(req.priority, Some(TaskPriority::High));
        assert!(req.tag_ids.is_empty());
    }

    #[test]
    fn test_create_request_rejects_unknown_status() {
        let result: Result<CreateTaskRequest, _> =
            serde_json::from_str(r#"{"title": "x", "status": "someday"}"#);
        assert!(result.is_err());
    }
}
