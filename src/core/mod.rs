//! Core utilities: configuration, errors, logging, export sink.

pub mod config;
pub mod error;
pub mod export;
pub mod logging;

pub use error::{AppError, AppResult};
pub use logging::init_logger;
