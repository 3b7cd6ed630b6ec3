use std::error::Error as StdError;
use std::fmt;

/// Discriminant for the store failures callers are expected to react to.
/// Everything the store cannot classify is `Other` and should be treated
/// as fatal for the request that hit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    Conflict,
    TxBegin,
    TxEnd,
    Other,
}

/// Error returned by every [`PageStore`](super::PageStore) operation.
///
/// Carries a kind, an optional human readable message and an optional
/// underlying cause. The kind is the contract: callers branch on it via
/// the `is_*` predicates or [`error_kind`], never on the rendered text.
#[derive(Debug)]
pub struct StoreError {
    kind: StoreErrorKind,
    message: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl StoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::NotFound,
            message: Some(message.into()),
            source: None,
        }
    }

    pub fn conflict(
        source: impl Into<Box<dyn StdError + Send + Sync>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: StoreErrorKind::Conflict,
            message: Some(message.into()),
            source: Some(source.into()),
        }
    }

    pub fn tx_begin(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            kind: StoreErrorKind::TxBegin,
            message: None,
            source: Some(source.into()),
        }
    }

    pub fn tx_end(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            kind: StoreErrorKind::TxEnd,
            message: None,
            source: Some(source.into()),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self {
            kind: StoreErrorKind::Other,
            message: Some("operation cancelled".to_string()),
            source: None,
        }
    }

    /// Unwraps an error coming back from the connection thread. Typed
    /// store errors cross that boundary boxed inside
    /// [`tokio_rusqlite::Error::Other`]; anything else is unclassified.
    pub(crate) fn from_call(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Other(inner) => match inner.downcast::<StoreError>() {
                Ok(err) => *err,
                Err(other) => Self {
                    kind: StoreErrorKind::Other,
                    message: None,
                    source: Some(other),
                },
            },
            other => Self {
                kind: StoreErrorKind::Other,
                message: None,
                source: Some(Box::new(other)),
            },
        }
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == StoreErrorKind::Conflict
    }

    #[allow(dead_code)]
    pub fn is_tx_begin(&self) -> bool {
        self.kind == StoreErrorKind::TxBegin
    }

    #[allow(dead_code)]
    pub fn is_tx_end(&self) -> bool {
        self.kind == StoreErrorKind::TxEnd
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            StoreErrorKind::NotFound => Some("not found"),
            StoreErrorKind::Conflict => Some("conflict"),
            StoreErrorKind::TxBegin => Some("tx begin"),
            StoreErrorKind::TxEnd => Some("tx end"),
            StoreErrorKind::Other => None,
        };

        let mut written = false;
        if let Some(label) = label {
            f.write_str(label)?;
            written = true;
        }
        if let Some(message) = &self.message {
            if written {
                f.write_str(": ")?;
            }
            f.write_str(message)?;
            written = true;
        }
        if let Some(source) = &self.source {
            if written {
                f.write_str(": ")?;
            }
            write!(f, "{source}")?;
        }
        Ok(())
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

// Lets closures running on the connection thread return store errors
// through the driver's error type.
impl From<StoreError> for tokio_rusqlite::Error {
    fn from(err: StoreError) -> Self {
        tokio_rusqlite::Error::Other(Box::new(err))
    }
}

/// Finds the store error kind anywhere in an error's source chain.
/// Useful at boundaries where the store error has been wrapped by
/// higher layers; returns `None` when no store error is involved.
pub fn error_kind(err: &(dyn StdError + 'static)) -> Option<StoreErrorKind> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(err) = current {
        if let Some(store_err) = err.downcast_ref::<StoreError>() {
            return Some(store_err.kind());
        }
        current = err.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn io_boom() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "boom")
    }

    #[test]
    fn not_found_renders_label_and_message() {
        let err = StoreError::not_found("page not found");
        assert_eq!(err.to_string(), "not found: page not found");
        assert!(err.source().is_none());
    }

    #[test]
    fn conflict_renders_label_message_and_cause() {
        let err = StoreError::conflict(io_boom(), "page already bookmarked");
        assert_eq!(err.to_string(), "conflict: page already bookmarked: boom");
        assert!(err.source().is_some());
    }

    #[test]
    fn transaction_errors_render_label_and_cause() {
        assert_eq!(StoreError::tx_begin(io_boom()).to_string(), "tx begin: boom");
        assert_eq!(StoreError::tx_end(io_boom()).to_string(), "tx end: boom");
    }

    #[test]
    fn unclassified_errors_render_without_a_label() {
        let err = StoreError {
            kind: StoreErrorKind::Other,
            message: None,
            source: Some(Box::new(io_boom())),
        };
        assert_eq!(err.to_string(), "boom");

        assert_eq!(StoreError::cancelled().to_string(), "operation cancelled");
    }

    #[test]
    fn predicates_match_only_their_own_kind() {
        let err = StoreError::not_found("x");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert!(!err.is_tx_begin());
        assert!(!err.is_tx_end());

        let err = StoreError::conflict(io_boom(), "x");
        assert!(err.is_conflict());
        assert!(!err.is_not_found());

        assert!(StoreError::tx_begin(io_boom()).is_tx_begin());
        assert!(StoreError::tx_end(io_boom()).is_tx_end());
        assert_eq!(StoreError::cancelled().kind(), StoreErrorKind::Other);
    }

    #[test]
    fn kind_is_recovered_through_wrapping_layers() {
        #[derive(Debug, thiserror::Error)]
        #[error("request failed")]
        struct Wrapper {
            #[source]
            inner: StoreError,
        }

        let wrapped = Wrapper {
            inner: StoreError::conflict(io_boom(), "taken"),
        };
        assert_eq!(error_kind(&wrapped), Some(StoreErrorKind::Conflict));

        let unrelated = io_boom();
        assert_eq!(error_kind(&unrelated), None);
    }

    #[test]
    fn typed_errors_survive_the_connection_boundary() {
        let driver_err: tokio_rusqlite::Error = StoreError::not_found("gone").into();
        let back = StoreError::from_call(driver_err);
        assert!(back.is_not_found());
        assert_eq!(back.to_string(), "not found: gone");

        let foreign = tokio_rusqlite::Error::ConnectionClosed;
        let back = StoreError::from_call(foreign);
        assert_eq!(back.kind(), StoreErrorKind::Other);
        assert!(back.source().is_some());
    }
}
