//! Error types for the application runtime.
//!
//! Operation errors (`TypeMismatch`, `KeyNotFound`, routing failures) are
//! returned to the caller. Callback errors (`SubscriberFailure`,
//! `TaskFailure`) are contained where they happen and only ever logged or
//! handed to an `on_error` callback.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// A state slot was written or read with a type other than its declared type.
    #[error("state '{key}' type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("state key '{0}' is undefined")]
    KeyNotFound(String),

    #[error("state key '{0}' is already defined")]
    DuplicateKey(String),

    #[error("route '{0}' is already registered")]
    DuplicateRoute(String),

    #[error("route '{0}' is undefined")]
    RouteNotFound(String),

    /// Page construction or view build failed.
    #[error("failed to render '{route}': {source}")]
    Render {
        route: String,
        #[source]
        source: anyhow::Error,
    },

    /// The window refused the built view.
    #[error("failed to mount '{route}': {source}")]
    Mount {
        route: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("subscriber '{name}' failed: {message}")]
    SubscriberFailure { name: String, message: String },

    #[error("background task failed: {0}")]
    TaskFailure(String),
}

impl AppError {
    /// The route a navigation error refers to, if any.
    pub fn route(&self) -> Option<&str> {
        match self {
            AppError::DuplicateRoute(route) | AppError::RouteNotFound(route) => Some(route),
            AppError::Render { route, .. } | AppError::Mount { route, .. } => Some(route),
            _ => None,
        }
    }
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Render a panic payload caught by `catch_unwind` as a message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
