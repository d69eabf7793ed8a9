//! Error type shared by every component of the crate.
//!
//! [`AlertsError`] carries a classification ([`ErrorKind`]), a static description, an
//! optional dynamic detail, an optional source and the location where it was created.
//! Components decide per kind whether an error is surfaced, retried or absorbed.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Result type for fallible operations in this crate.
pub type AlertsResult<T> = Result<T, AlertsError>;

/// Classification of failures.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Throttling
    RateLimitExceeded,

    // Push registration
    PermissionDenied,
    RegistrationTimeout,
    PushUnsupported,
    RegistrationFailed,

    // Change feed
    SubscriptionTransportError,
    SubscriptionRejected,

    // Persistence
    PersistenceError,
    StoreError,

    // Data & configuration
    ConfigError,
    InvalidData,
    SerializationError,
    DeserializationError,
    IoError,

    Unknown,
}

impl ErrorKind {
    /// Returns `true` for failures the change feed recovers from by reconnecting.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::SubscriptionTransportError
                | ErrorKind::SubscriptionRejected
                | ErrorKind::IoError
        )
    }
}

#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Main error type of the crate.
#[derive(Debug, Clone)]
pub struct AlertsError {
    payload: Box<ErrorPayload>,
}

impl AlertsError {
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    pub fn description(&self) -> &str {
        &self.payload.description
    }

    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the callsite that created this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches the originating error, exposed through [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        AlertsError {
            payload: Box::new(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
            }),
        }
    }
}

impl PartialEq for AlertsError {
    fn eq(&self, other: &AlertsError) -> bool {
        self.payload.kind == other.payload.kind
            && self.payload.description == other.payload.description
    }
}

impl fmt::Display for AlertsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = &self.payload;
        write!(
            f,
            "[{:?}] {} @ {}:{}",
            payload.kind,
            payload.description,
            payload.location.file(),
            payload.location.line()
        )?;

        if let Some(detail) = payload.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for AlertsError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn error::Error + 'static))
    }
}

impl From<(ErrorKind, &'static str)> for AlertsError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> AlertsError {
        AlertsError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

impl<D> From<(ErrorKind, &'static str, D)> for AlertsError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> AlertsError {
        AlertsError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

impl From<std::io::Error> for AlertsError {
    #[track_caller]
    fn from(err: std::io::Error) -> AlertsError {
        let detail = err.to_string();
        AlertsError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<serde_json::Error> for AlertsError {
    #[track_caller]
    fn from(err: serde_json::Error) -> AlertsError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        AlertsError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<reqwest::Error> for AlertsError {
    #[track_caller]
    fn from(err: reqwest::Error) -> AlertsError {
        let (kind, description) = if err.is_decode() {
            (ErrorKind::DeserializationError, "Data Store response could not be decoded")
        } else {
            (ErrorKind::PersistenceError, "Data Store request failed")
        };

        let detail = err.to_string();
        AlertsError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AlertsError {
    #[track_caller]
    fn from(err: tokio_tungstenite::tungstenite::Error) -> AlertsError {
        let detail = err.to_string();
        AlertsError::from_components(
            ErrorKind::SubscriptionTransportError,
            Cow::Borrowed("change feed transport failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alerts_error, bail};

    fn fails_with_bail() -> AlertsResult<()> {
        bail!(ErrorKind::InvalidData, "bad input", "field `x`");
    }

    #[test]
    fn display_includes_kind_description_and_detail() {
        let err = alerts_error!(
            ErrorKind::PersistenceError,
            "subscriber upsert failed",
            "status 500"
        );
        let rendered = err.to_string();

        assert!(rendered.starts_with("[PersistenceError] subscriber upsert failed @ "));
        assert!(rendered.contains("Detail: status 500"));
    }

    #[test]
    fn bail_returns_error_with_detail() {
        let err = fails_with_bail().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.detail(), Some("field `x`"));
    }

    #[test]
    fn source_is_preserved() {
        let io = std::io::Error::other("disk full");
        let err = alerts_error!(ErrorKind::StoreError, "write failed", source: io);

        let source = error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "disk full");
    }

    #[test]
    fn json_errors_map_to_deserialization() {
        let err: AlertsError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::DeserializationError);
    }

    #[test]
    fn equality_ignores_location_and_detail() {
        let a = alerts_error!(ErrorKind::Unknown, "boom", "a");
        let b = alerts_error!(ErrorKind::Unknown, "boom", "b");
        assert_eq!(a, b);
    }
}
