//! Structured errors
//!
//! Every failure, whether it happens before the request is sent, on the
//! wire, in the service or while decoding, is reported as one [`SqsError`].
//! Which fields are populated tells the kinds apart; [`SqsError::kind`]
//! does the classification.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// The underlying failure behind an [`SqsError`]
#[derive(Debug, Error)]
pub enum ErrorCause {
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid resource path: {0}")]
    InvalidPath(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Error response carries no error code")]
    NotAnErrorDocument,

    #[error("Invalid queue URL {url}: {source}")]
    InvalidQueueUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("MD5 mismatch: expected {expected}, service reported {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Which stage of a call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, nothing was sent
    Construction,
    /// No HTTP response was received
    Transport,
    /// The service answered with a non-success status
    Service,
    /// Success status, but the body could not be decoded
    Decode,
}

/// Whether the service blamed the caller or itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Sender,
    Receiver,
}

impl ErrorType {
    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Sender" => Some(Self::Sender),
            "Receiver" => Some(Self::Receiver),
            _ => None,
        }
    }
}

/// Error returned by every operation
#[derive(Debug, Default)]
pub struct SqsError {
    pub cause: Option<ErrorCause>,
    /// HTTP status code, absent when no response was received
    pub status_code: Option<u16>,
    /// HTTP reason phrase ("Forbidden", "Bad Request", ...)
    pub status_text: String,
    pub error_type: Option<ErrorType>,
    /// Service error code ("InvalidParameterValue", ...)
    pub code: String,
    pub message: String,
    pub request_id: String,
}

impl SqsError {
    pub fn with_status(mut self, status_code: u16, status_text: impl Into<String>) -> Self {
        self.status_code = Some(status_code);
        self.status_text = status_text.into();
        self
    }

    pub fn kind(&self) -> ErrorKind {
        if self
            .status_code
            .is_some_and(|code| !(200..300).contains(&code))
        {
            return ErrorKind::Service;
        }

        match &self.cause {
            Some(
                ErrorCause::InvalidUrl(_)
                | ErrorCause::InvalidEndpoint(_)
                | ErrorCause::InvalidPath(_),
            ) => ErrorKind::Construction,
            Some(ErrorCause::Http(_)) => ErrorKind::Transport,
            _ => ErrorKind::Decode,
        }
    }
}

impl From<ErrorCause> for SqsError {
    fn from(cause: ErrorCause) -> Self {
        Self {
            cause: Some(cause),
            ..Self::default()
        }
    }
}

impl fmt::Display for SqsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.code.is_empty() {
            write!(f, "{}: {}", self.code, self.message)?;
        } else if let Some(cause) = &self.cause {
            write!(f, "{}", cause)?;
        } else {
            write!(f, "Request failed")?;
        }

        if let Some(status) = self.status_code {
            write!(f, " (HTTP {} {})", status, self.status_text)?;
        }
        Ok(())
    }
}

impl std::error::Error for SqsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
    request_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ErrorDetail {
    r#type: String,
    code: String,
    message: String,
    request_id: String,
}

fn parse_error_body(body: &str) -> Result<(ErrorDetail, String), quick_xml::DeError> {
    let response: ErrorResponse = quick_xml::de::from_str(body)?;
    match response.error {
        Some(detail) => Ok((detail, response.request_id)),
        // Some endpoints answer with a bare <Error> document
        None => {
            let detail: ErrorDetail = quick_xml::de::from_str(body)?;
            let request_id = detail.request_id.clone();
            Ok((detail, request_id))
        }
    }
}

/// Build the error for a non-success response
///
/// Status fields are always set. When the body does not parse, or parses
/// without a `Code` (an HTML page from a proxy, say), the failure becomes the
/// cause and the service fields stay empty.
pub(crate) fn build_error(status_code: u16, status_text: &str, body: &str) -> SqsError {
    let error = SqsError::default().with_status(status_code, status_text);

    match parse_error_body(body) {
        Ok((detail, _)) if detail.code.trim().is_empty() => SqsError {
            cause: Some(ErrorCause::NotAnErrorDocument),
            ..error
        },
        Ok((detail, request_id)) => SqsError {
            error_type: ErrorType::parse(&detail.r#type),
            code: detail.code.trim().to_string(),
            message: detail.message.trim().to_string(),
            request_id: request_id.trim().to_string(),
            ..error
        },
        Err(e) => SqsError {
            cause: Some(ErrorCause::Xml(e)),
            ..error
        },
    }
}
