use thiserror::Error;

pub type Result<T> = std::result::Result<T, LogQueryError>;

#[derive(Debug, Error)]
pub enum LogQueryError {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("invalid date format: {input} - {reason}")]
    TimeFormat { input: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("bootstrap failed for region {region}: {reason}")]
    Bootstrap { region: String, reason: String },

    #[error("request to {target} failed: {reason}")]
    Transport { target: String, reason: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LogQueryError {
    /// Caller-side problems, reported as 400 rather than 500.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LogQueryError::InvalidRequest(_) | LogQueryError::TimeFormat { .. }
        )
    }
}

impl From<rusqlite::Error> for LogQueryError {
    fn from(e: rusqlite::Error) -> Self {
        LogQueryError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_classification() {
        assert!(LogQueryError::InvalidRequest("x".into()).is_validation());
        assert!(LogQueryError::TimeFormat { input: "a".into(), reason: "b".into() }.is_validation());
        assert!(!LogQueryError::Storage("disk".into()).is_validation());
        assert!(!LogQueryError::Bootstrap { region: "NA".into(), reason: "x".into() }.is_validation());
    }

    #[test]
    fn sqlite_errors_become_storage() {
        let err: LogQueryError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, LogQueryError::Storage(_)));
    }
}
