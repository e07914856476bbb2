//! Path handlers and the registration capability shared by all subsystems.

use std::collections::HashMap;
use std::sync::Arc;

use axum::response::{IntoResponse, Json, Response};

/// Query parameters of a diagnostic page request.
pub type PageArgs = HashMap<String, String>;

/// Renders one diagnostic page.
pub type PathHandler = Arc<dyn Fn(&PageArgs) -> Page + Send + Sync>;

/// Rendered body of a diagnostic page.
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Text(String),
    Json(serde_json::Value),
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        match self {
            Page::Text(body) => body.into_response(),
            Page::Json(value) => Json(value).into_response(),
        }
    }
}

/// Anything that diagnostic pages can be attached to.
///
/// Registration is allowed before and after the listener starts; registering
/// the same path twice replaces the earlier handler.
pub trait PathHandlerRegistry {
    fn register_path_handler(&self, path: &str, handler: PathHandler);
}
