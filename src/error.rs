use thiserror::Error;

use crate::db::StoreError;
use crate::ingest::IngestError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    // Display stays flat but the store/ingest error remains reachable
    // through source(), so callers can still classify it.
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Ingest(#[from] IngestError),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use crate::db::{error_kind, StoreErrorKind};

    use super::*;

    #[test]
    fn store_kind_survives_both_wrapping_layers() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "dup");
        let err = AppError::Ingest(IngestError::Store(StoreError::conflict(io, "taken")));
        assert_eq!(error_kind(&err), Some(StoreErrorKind::Conflict));

        let err = AppError::Config("bad".to_string());
        assert_eq!(error_kind(&err), None);
    }
}
