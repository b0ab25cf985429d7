use serde::{Deserialize, Serialize};

use crate::{config::settings::Settings, error::AppError};

/// Query parameters accepted by every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// A validated page request, ready to bind as `LIMIT`/`OFFSET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    pub fn resolve(query: &PageQuery, settings: &Settings) -> Result<Self, AppError> {
        let page = query.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::UnprocessableEntity(
                "page must be at least 1".to_string(),
            ));
        }

        let page_size = query.page_size.unwrap_or(settings.default_page_size);
        if page_size < 1 {
            return Err(AppError::UnprocessableEntity(
                "page_size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            page,
            page_size: page_size.min(settings.max_page_size),
        })
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn into_page<T>(self, results: Vec<T>, count: i64) -> Page<T> {
        Page {
            has_more: self.offset() + (results.len() as i64) < count,
            results,
            count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Paginated list body.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub has_more: bool,
}
