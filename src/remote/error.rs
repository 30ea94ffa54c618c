//! Remote API error types.
//!
//! Every call to Slack, Sheets or Drive can fail independently. The error
//! records which service failed and whether the failure is worth retrying:
//!
//! - **Transient**: HTTP 429, HTTP 5xx, network errors and timeouts
//! - **Permanent**: everything else (bad requests, auth failures, API-level
//!   `ok: false` responses)

use std::fmt;

use thiserror::Error;

/// The external system a remote call was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteService {
    /// The tracker spreadsheet.
    Tracker,
    /// The chat workspace.
    Chat,
    /// Per-puzzle documents.
    Documents,
}

impl fmt::Display for RemoteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteService::Tracker => f.write_str("tracker"),
            RemoteService::Chat => f.write_str("chat"),
            RemoteService::Documents => f.write_str("documents"),
        }
    }
}

/// Whether a remote failure is retriable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Transient,
    Permanent,
}

/// A failed remote call.
#[derive(Debug, Error)]
pub struct RemoteError {
    pub service: RemoteService,

    pub kind: RemoteErrorKind,

    /// The HTTP status code, if the failure came with one.
    pub status_code: Option<u16>,

    pub message: String,

    /// How long the server asked us to wait before trying again.
    pub retry_after: Option<std::time::Duration>,

    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} API error (HTTP {}): {}", self.service, code, self.message),
            None => write!(f, "{} API error: {}", self.service, self.message),
        }
    }
}

impl RemoteError {
    /// A permanent failure with no underlying error.
    pub fn permanent(service: RemoteService, message: impl Into<String>) -> Self {
        RemoteError {
            service,
            kind: RemoteErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    /// A transient failure with no underlying error.
    pub fn transient(service: RemoteService, message: impl Into<String>) -> Self {
        RemoteError {
            service,
            kind: RemoteErrorKind::Transient,
            status_code: None,
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    /// Categorizes a non-success HTTP status.
    pub fn from_status(service: RemoteService, status: u16, message: impl Into<String>) -> Self {
        let kind = if status == 429 || (500..600).contains(&status) {
            RemoteErrorKind::Transient
        } else {
            RemoteErrorKind::Permanent
        };
        RemoteError {
            service,
            kind,
            status_code: Some(status),
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    /// Categorizes an HTTP client error.
    ///
    /// Connection failures and timeouts are transient; anything carrying a
    /// status is categorized by that status.
    pub fn from_reqwest(service: RemoteService, err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let kind = match status_code {
            Some(code) if code == 429 || (500..600).contains(&code) => RemoteErrorKind::Transient,
            Some(_) => RemoteErrorKind::Permanent,
            None if err.is_timeout() || err.is_connect() || err.is_request() => {
                RemoteErrorKind::Transient
            }
            None => RemoteErrorKind::Permanent,
        };
        RemoteError {
            service,
            kind,
            status_code,
            message: err.to_string(),
            retry_after: None,
            source: Some(Box::new(err)),
        }
    }

    /// Records a `Retry-After` header value given in seconds.
    pub fn with_retry_after(mut self, header: Option<&str>) -> Self {
        self.retry_after = header
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(std::time::Duration::from_secs);
        self
    }

    pub fn is_retriable(&self) -> bool {
        self.kind == RemoteErrorKind::Transient
    }
}

/// The `Retry-After` header of a response, if it has one.
pub fn retry_after_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_categorization() {
        let cases = [
            (429, true),
            (500, true),
            (503, true),
            (599, true),
            (400, false),
            (403, false),
            (404, false),
        ];
        for (status, retriable) in cases {
            let err = RemoteError::from_status(RemoteService::Chat, status, "boom");
            assert_eq!(err.is_retriable(), retriable, "status {status}");
            assert_eq!(err.status_code, Some(status));
        }
    }

    #[test]
    fn retry_after_is_read_in_seconds() {
        let err = RemoteError::from_status(RemoteService::Chat, 429, "slow down")
            .with_retry_after(Some("12"));
        assert_eq!(err.retry_after, Some(std::time::Duration::from_secs(12)));

        let err = RemoteError::from_status(RemoteService::Chat, 429, "slow down")
            .with_retry_after(Some("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(err.retry_after, None);
    }

    #[test]
    fn display_includes_service_and_status() {
        let err = RemoteError::from_status(RemoteService::Tracker, 502, "bad gateway");
        assert_eq!(err.to_string(), "tracker API error (HTTP 502): bad gateway");

        let err = RemoteError::permanent(RemoteService::Documents, "no file id");
        assert_eq!(err.to_string(), "documents API error: no file id");
    }
}
