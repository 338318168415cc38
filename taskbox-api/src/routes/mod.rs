//! API route handlers
//!
//! One module per resource:
//!
//! - `health`: health check
//! - `auth`: registration, login, token refresh
//! - `users`: current-user profile + admin user management
//! - `tasks`: task CRUD, search, statistics, tag attachment
//! - `categories`: category CRUD and statistics
//! - `tags`: tag CRUD and statistics
//!
//! This module also holds the response envelope and pagination helpers
//! every list endpoint shares.

pub mod auth;
pub mod categories;
pub mod health;
pub mod tags;
pub mod tasks;
pub mod users;

use serde::{Deserialize, Serialize};

/// Keeps `"field": null` distinguishable from an absent field in update
/// bodies: absent stays `None` via `#[serde(default)]`, an explicit null
/// becomes `Some(None)`.
pub(crate) fn deserialize_explicit_null<'de, D, T>(
    deserializer: D,
) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Standard response envelope: `{"status": "success", "message", "data"}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always "success" (errors use `ErrorResponse`)
    pub status: &'static str,

    /// Optional human-readable message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,

    /// Response payload
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Envelope with data only
    pub fn new(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data,
        }
    }

    /// Envelope with data and a message
    pub fn with_message(message: &'static str, data: T) -> Self {
        Self {
            status: "success",
            message: Some(message),
            data,
        }
    }
}

/// Paginated response envelope for list endpoints
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// Always "success"
    pub status: &'static str,

    /// The requested page of items
    pub data: Vec<T>,

    /// Current page number (1-based)
    pub page: u32,

    /// Items per page
    pub per_page: u32,

    /// Total matching items
    pub total: i64,

    /// Total pages
    pub pages: i64,
}

impl<T> PaginatedResponse<T> {
    /// Builds the envelope, deriving `pages` from `total` and `per_page`
    pub fn new(data: Vec<T>, page: u32, per_page: u32, total: i64) -> Self {
        let pages = (total + per_page as i64 - 1) / per_page as i64;
        Self {
            status: "success",
            data,
            page,
            per_page,
            total,
            pages,
        }
    }
}

/// Common pagination query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    /// Page number, 1-based (default 1)
    pub page: Option<u32>,

    /// Items per page (default 20, max 100)
    pub per_page: Option<u32>,
}

/// Normalized pagination: page, per_page, and the SQL limit/offset pair
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Clamps raw query parameters into a sane range
    pub fn from_query(query: &PageQuery) -> Self {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        Self { page, per_page }
    }

    /// SQL LIMIT
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    /// SQL OFFSET
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::from_query(&PageQuery {
            page: None,
            per_page: None,
        });
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 20);
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination::from_query(&PageQuery {
            page: Some(0),
            per_page: Some(10_000),
        });
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 100);

        let p = Pagination::from_query(&PageQuery {
            page: Some(3),
            per_page: Some(25),
        });
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn test_paginated_response_page_count() {
        let r = PaginatedResponse::new(vec![1, 2, 3], 1, 20, 41);
        assert_eq!(r.pages, 3);

        let r = PaginatedResponse::new(Vec::<i32>::new(), 1, 20, 0);
        assert_eq!(r.pages, 0);

        let r = PaginatedResponse::new(vec![1], 1, 20, 20);
        assert_eq!(r.pages, 1);
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::with_message("Created", 7)).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Created");
        assert_eq!(body["data"], 7);

        let body = serde_json::to_value(ApiResponse::new(7)).unwrap();
        assert!(body.get("message").is_none());
    }
}
