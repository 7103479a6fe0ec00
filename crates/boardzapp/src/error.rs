use crate::model::EntityKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardzError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Server responded with HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("No data provider has been initialized")]
    NotInitialized,
}

impl BoardzError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True for failures of the substrate (disk, database, network, server),
    /// as opposed to caller mistakes or missing entities.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Store(_)
                | Self::Http { .. }
                | Self::Io(_)
                | Self::Serialization(_)
                | Self::Database(_)
                | Self::Network(_)
                | Self::Config(_)
        )
    }

    /// HTTP status carried by a remote failure, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BoardzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(BoardzError::Store("disk full".into()).is_storage());
        assert!(BoardzError::Http {
            status: 500,
            message: "boom".into()
        }
        .is_storage());
        assert!(!BoardzError::validation("empty name").is_storage());
        assert!(!BoardzError::not_found(EntityKind::Board, "b1").is_storage());
        assert!(!BoardzError::NotInitialized.is_storage());
    }

    #[test]
    fn test_http_status() {
        let err = BoardzError::Http {
            status: 401,
            message: "unauthorized".into(),
        };
        assert_eq!(err.http_status(), Some(401));
        assert_eq!(BoardzError::Store("x".into()).http_status(), None);
    }

    #[test]
    fn test_not_found_message() {
        let err = BoardzError::not_found(EntityKind::Column, "c-42");
        assert_eq!(err.to_string(), "column not found: c-42");
    }
}
