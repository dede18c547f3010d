//! Core utilities: configuration and error types

pub mod config;
pub mod error;

pub use error::{AppError, AppResult};
