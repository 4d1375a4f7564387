use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum AppraiserError {
    ApiError(String),
    ParseError(String),
    ConfigError(String),
    DatabaseError(String),
    NetworkError(String),
    IoError(String),
}

impl fmt::Display for AppraiserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppraiserError::ApiError(msg) => write!(f, "API Error: {}", msg),
            AppraiserError::ParseError(msg) => write!(f, "Parse Error: {}", msg),
            AppraiserError::ConfigError(msg) => write!(f, "Config Error: {}", msg),
            AppraiserError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppraiserError::NetworkError(msg) => write!(f, "Network Error: {}", msg),
            AppraiserError::IoError(msg) => write!(f, "IO Error: {}", msg),
        }
    }
}

impl Error for AppraiserError {}

impl From<reqwest::Error> for AppraiserError {
    fn from(err: reqwest::Error) -> Self {
        AppraiserError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for AppraiserError {
    fn from(err: serde_json::Error) -> Self {
        AppraiserError::ParseError(err.to_string())
    }
}

impl From<sqlx::Error> for AppraiserError {
    fn from(err: sqlx::Error) -> Self {
        AppraiserError::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppraiserError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppraiserError::DatabaseError(err.to_string())
    }
}

impl From<std::io::Error> for AppraiserError {
    fn from(err: std::io::Error) -> Self {
        AppraiserError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppraiserError>;
