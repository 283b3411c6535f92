use thiserror::Error;

use crate::core::types::OrderStatus;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
///
/// Domain variants describe outcomes the bot translates into user-facing replies;
/// the remaining variants wrap infrastructure failures.
#[derive(Error, Debug)]
pub enum AppError {
    /// Update carries neither a message nor a callback query
    #[error("Update carries no handleable payload")]
    EmptyEvent,

    /// Referenced catalog item is missing or deactivated. Carries the item
    /// name when the row exists, else the id the caller used, for the reply.
    #[error("Menu item {0} is not available")]
    ItemUnavailable(String),

    /// Order does not exist or belongs to another user
    #[error("Order {0} not found")]
    OrderNotFound(i64),

    /// Requested status change violates open -> confirmed -> completed
    #[error("Cannot move order from '{from}' to '{to}'")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Caller is not an active administrator
    #[error("User {0} is not authorized for this operation")]
    Unauthorized(i64),

    /// Malformed user input (wizard fields, command arguments)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

impl AppError {
    /// Domain errors are terminal per event and become deterministic replies.
    /// Everything else is an infrastructure fault worth an error-level log.
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            AppError::Database(_) | AppError::DatabasePool(_) | AppError::Telegram(_)
        )
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_flagged() {
        assert!(AppError::EmptyEvent.is_domain());
        assert!(AppError::ItemUnavailable("1".to_string()).is_domain());
        assert!(AppError::Unauthorized(42).is_domain());
        assert!(AppError::Validation("bad price".to_string()).is_domain());
        assert!(!AppError::Database(rusqlite::Error::InvalidQuery).is_domain());
    }

    #[test]
    fn test_transition_error_message() {
        let err = AppError::InvalidTransition {
            from: OrderStatus::Open,
            to: OrderStatus::Completed,
        };
        assert_eq!(err.to_string(), "Cannot move order from 'open' to 'completed'");
    }
}
