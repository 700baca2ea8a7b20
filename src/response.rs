use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ErrorDetail;

/// Standard API response wrapper.
///
/// All Byline endpoints return this format:
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "error": null
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful response with data.
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status = if self.success {
            axum::http::StatusCode::OK
        } else {
            axum::http::StatusCode::BAD_REQUEST
        };
        (status, axum::Json(self)).into_response()
    }
}

/// Acknowledgement body for delete endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct Deleted {
    pub id: i32,
}

/// One page of a listing, with Django-paginator-style page metadata.
///
/// Page numbers are 1-based. `total_pages` is never below 1, so an empty
/// result set still reads as page 1 of 1.
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    /// Map the items of this page into another representation, keeping the
    /// page metadata intact.
    pub fn map<U: Serialize>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}
