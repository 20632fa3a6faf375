//! Envelopes de sucesso `{success: true, data, meta?}`

use axum::{http::StatusCode, Json};
use common_db::models::Page;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Corpo JSON de sucesso
pub type Envelope<T> = Json<ApiResponse<T>>;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,
}

impl<T> From<&Page<T>> for PageMeta {
    fn from(page: &Page<T>) -> Self {
        Self {
            current_page: page.page,
            per_page: page.per_page,
            total: page.total,
            last_page: page.last_page(),
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> Envelope<T> {
    Json(ApiResponse { success: true, data, meta: None, message: None })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Envelope<T>) {
    (StatusCode::CREATED, ok(data))
}

pub fn with_message<T: Serialize>(data: T, message: &str) -> Envelope<T> {
    Json(ApiResponse {
        success: true,
        data,
        meta: None,
        message: Some(message.to_string()),
    })
}

pub fn paginated<T: Serialize>(page: Page<T>) -> Envelope<Vec<T>> {
    let meta = PageMeta::from(&page);
    Json(ApiResponse {
        success: true,
        data: page.items,
        meta: Some(meta),
        message: None,
    })
}

/// Resposta de exclusão
pub fn deleted(message: &str) -> Envelope<Option<()>> {
    with_message(None, message)
}
