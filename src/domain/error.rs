use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Please enter a sitemap URL")]
    EmptyInput,

    #[error("Invalid URL. Please include http:// or https://")]
    InvalidInput,

    #[error("API error: {0}")]
    Api(String),

    #[error("Connection lost: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(String),
}
