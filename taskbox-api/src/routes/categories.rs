//! Category endpoints
//!
//! # Endpoints
//!
//! - `POST /api/v1/categories` - create
//! - `GET /api/v1/categories` - list (sortable, paginated)
//! - `GET /api/v1/categories/stats` - per-category task counters
//! - `GET|PUT|DELETE /api/v1/categories/:id`

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
use serde::{Deserialize, Serialize};
use taskbox_shared::{
    auth::{middleware::AuthContext, ownership::ensure_owner},
    models::{
        category::{Category, CategorySortKey, CategoryStats, CreateCategory, UpdateCategory},
        SortOrder,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    /// Category name
    #[validate(length(min = 1, max = 64, message = "Name must be 1 to 64 characters"))]
    pub name: String,

    /// Optional description
    #[validate(length(max = 256, message = "Description must be at most 256 characters"))]
    pub description: Option<String>,
}

/// Update request; absent fields are left alone, a null description clears it
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be 1 to 64 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "super::deserialize_explicit_null")]
    pub description: Option<Option<String>>,
}

/// List query: pagination plus sorting
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Category stats response row: the category plus its task counters
#[derive(Debug, Serialize)]
pub struct CategoryStatsBody {
    #[serde(flatten)]
    pub category: CategoryStats,
    pub completion_rate: f64,
}

impl From<CategoryStats> for CategoryStatsBody {
    fn from(stats: CategoryStats) -> Self {
        let completion_rate = stats.completion_rate();
        Self {
            category: stats,
            completion_rate,
        }
    }
}

async fn owned_category(state: &AppState, auth: &AuthContext, id: Uuid) -> ApiResult<Category> {
    let category = Category::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    ensure_owner(auth, &category, state.admin_override())
        .map_err(|_| ApiError::NotFound("Category not found".to_string()))?;

    Ok(category)
}

/// Create a new category
pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Category>>)> {
    req.validate().map_err(ApiError::from_validation)?;

    let category = Category::create(
        &state.db,
        CreateCategory {
            user_id: auth.user_id,
            name: req.name,
            description: req.description,
        },
    )
    .await?;

    tracing::info!(category_id = %category.id, user_id = %auth.user_id, "category created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Category created successfully",
            category,
        )),
    ))
}

/// List the current user's categories
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<PaginatedResponse<Category>>> {
    let sort_by = match query.sort_by.as_deref() {
        Some(raw) => CategorySortKey::parse(raw)
            .ok_or_else(|| ApiError::invalid_field("sort_by", format!("Unknown sort field: {}", raw)))?,
        None => CategorySortKey::Name,
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

    let categories = Category::list(
        &state.db,
        auth.user_id,
        sort_by,
        sort_order,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    let total = Category::count(&state.db, auth.user_id).await?;

    Ok(Json(PaginatedResponse::new(
        categories,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Per-category task counters for the current user
pub async fn category_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<Vec<CategoryStatsBody>>>> {
    let stats = Category::stats(&state.db, auth.user_id).await?;

    Ok(Json(ApiResponse::new(
        stats.into_iter().map(CategoryStatsBody::from).collect(),
    )))
}

/// Get a specific category by ID
pub async fn get_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Category>>> {
    let category = owned_category(&state, &auth, category_id).await?;

    Ok(Json(ApiResponse::new(category)))
}

/// Update a specific category by ID
pub async fn update_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(category_id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<Json<ApiResponse<Category>>> {
    req.validate().map_err(ApiError::from_validation)?;

    let category = owned_category(&state, &auth, category_id).await?;

    if let Some(Some(ref description)) = req.description {
        if description.chars().count() > 256 {
            return Err(ApiError::invalid_field(
                "description",
                "Description must be at most 256 characters",
            ));
        }
    }

    let updated = Category::update(
        &state.db,
        category.id,
        UpdateCategory {
            name: req.name,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    tracing::info!(category_id = %updated.id, user_id = %auth.user_id, "category updated");

    Ok(Json(ApiResponse::with_message(
        "Category updated successfully",
        updated,
    )))
}

/// Delete a specific category by ID; its tasks become uncategorized
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let category = owned_category(&state, &auth, category_id).await?;

    Category::delete(&state.db, category.id).await?;

    tracing::info!(category_id = %category.id, user_id = %auth.user_id, "category deleted");

    Ok(Json(ApiResponse::with_message(
        "Category deleted successfully",
        (),
    )))
}
