//! Tag endpoints
//!
//! # Endpoints
//!
//! - `POST /api/v1/tags` - create
//! - `GET /api/v1/tags` - list (sortable, paginated)
//! - `GET /api/v1/tags/stats` - usage counters, most-used first
//! - `GET|PUT|DELETE /api/v1/tags/:id`

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
use serde::Deserialize;
use taskbox_shared::{
    auth::{middleware::AuthContext, ownership::ensure_owner},
    models::{
        tag::{CreateTag, Tag, TagSortKey, TagStats},
        SortOrder,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    /// Tag name
    #[validate(length(min = 1, max = 64, message = "Name must be 1 to 64 characters"))]
    pub name: String,
}

/// Update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTagRequest {
    /// New tag name
    #[validate(length(min = 1, max = 64, message = "Name must be 1 to 64 characters"))]
    pub name: String,
}

/// List query: pagination plus sorting
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

async fn owned_tag(state: &AppState, auth: &AuthContext, id: Uuid) -> ApiResult<Tag> {
    let tag = Tag::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;

    ensure_owner(auth, &tag, state.admin_override())
        .map_err(|_| ApiError::NotFound("Tag not found".to_string()))?;

    Ok(tag)
}

/// Create a new tag
pub async fn create_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Tag>>)> {
    req.validate().map_err(ApiError::from_validation)?;

    let tag = Tag::create(
        &state.db,
        CreateTag {
            user_id: auth.user_id,
            name: req.name,
        },
    )
    .await?;

    tracing::info!(tag_id = %tag.id, user_id = %auth.user_id, "tag created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Tag created successfully", tag)),
    ))
}

/// List the current user's tags
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<PaginatedResponse<Tag>>> {
    let sort_by = match query.sort_by.as_deref() {
        Some(raw) => TagSortKey::parse(raw)
            .ok_or_else(|| ApiError::invalid_field("sort_by", format!("Unknown sort field: {}", raw)))?,
        None => TagSortKey::Name,
    };

    let sort_order = match query.sort_order.as_deref() {
        Some(raw) => SortOrder::parse(raw)
            .ok_or_else(|| ApiError::invalid_field("sort_order", "Must be 'asc' or 'desc'"))?,
        None => SortOrder::Asc,
    };

    let pagination = Pagination::from_query(&PageQuery {
        page: query.page,
        per_page: query.per_page,
    });

    let tags = Tag::list(
        &state.db,
        auth.user_id,
        sort_by,
        sort_order,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    let total = Tag::count(&state.db, auth.user_id).await?;

    Ok(Json(PaginatedResponse::new(
        tags,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Usage counters for the current user's tags
pub async fn tag_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<Vec<TagStats>>>> {
    let stats = Tag::stats(&state.db, auth.user_id).await?;

    Ok(Json(ApiResponse::new(stats)))
}

/// Get a specific tag by ID
pub async fn get_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(tag_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Tag>>> {
    let tag = owned_tag(&state, &auth, tag_id).await?;

    Ok(Json(ApiResponse::new(tag)))
}

/// Rename a specific tag by ID
pub async fn update_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(tag_id): Path<Uuid>,
    Json(req): Json<UpdateTagRequest>,
) -> ApiResult<Json<ApiResponse<Tag>>> {
    req.validate().map_err(ApiError::from_validation)?;

    let tag = owned_tag(&state, &auth, tag_id).await?;

    let updated = Tag::rename(&state.db, tag.id, req.name)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;

    tracing::info!(tag_id = %updated.id, user_id = %auth.user_id, "tag renamed");

    Ok(Json(ApiResponse::with_message(
        "Tag updated successfully",
        updated,
    )))
}

/// Delete a specific tag by ID; it disappears from every task
pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(tag_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let tag = owned_tag(&state, &auth, tag_id).await?;

    Tag::delete(&state.db, tag.id).await?;

    tracing::info!(tag_id = %tag.id, user_id = %auth.user_id, "tag deleted");

    Ok(Json(ApiResponse::with_message(
        "Tag deleted successfully",
        (),
    )))
}
