use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Deserialize;
use utoipa::IntoParams;

/// 1-based page-number extractor (`?page=`), Django-paginator style.
///
/// A missing, zero or unparsable value means page 1. Requests beyond the
/// last page are clamped to the last page when the query runs, not here.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct Page {
    /// Page number to fetch (1-based, default: 1)
    #[serde(default = "default_page")]
    pub page: u64,
}

fn default_page() -> u64 {
    1
}

impl Default for Page {
    fn default() -> Self {
        Page { page: 1 }
    }
}

impl Page {
    pub fn number(self) -> u64 {
        self.page.max(1)
    }
}

impl<S> FromRequestParts<S> for Page
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or("");
        let page: Page = serde_urlencoded::from_str(query).unwrap_or_default();
        Ok(page)
    }
}
