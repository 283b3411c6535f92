//! Core utilities: configuration, errors, logging, money, and the order domain

pub mod config;
pub mod error;
pub mod logging;
pub mod money;
pub mod orders;
pub mod types;

pub use error::{AppError, AppResult};
pub use logging::init_logger;
pub use types::OrderStatus;
