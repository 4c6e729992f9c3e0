pub mod client;
pub mod models;
pub mod sse;

pub use client::{ApiClient, ApiError, Result};
pub use models::ApiConfig;
