//! Query API error responses

use crate::storage::QueueError;

/// Error codes the test server answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidClientTokenId,
    SignatureDoesNotMatch,
    MissingParameter,
    InvalidParameterValue,
    InvalidAction,
    InvalidAttributeName,
    NoSuchVersion,
    NonExistentQueue,
    QueueAlreadyExists,
    ReceiptHandleIsInvalid,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidClientTokenId => "InvalidClientTokenId",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            Self::MissingParameter => "MissingParameter",
            Self::InvalidParameterValue => "InvalidParameterValue",
            Self::InvalidAction => "InvalidAction",
            Self::InvalidAttributeName => "InvalidAttributeName",
            Self::NoSuchVersion => "NoSuchVersion",
            Self::NonExistentQueue => "AWS.SimpleQueueService.NonExistentQueue",
            Self::QueueAlreadyExists => "AWS.SimpleQueueService.QueueNameExists",
            Self::ReceiptHandleIsInvalid => "ReceiptHandleIsInvalid",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClientTokenId | Self::SignatureDoesNotMatch => 403,
            _ => 400,
        }
    }
}

/// An error as the service reports it
#[derive(Debug)]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Format as a query API `ErrorResponse` document
    pub fn to_xml(&self, request_id: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<ErrorResponse xmlns="http://queue.amazonaws.com/doc/2009-02-01/">
  <Error>
    <Type>Sender</Type>
    <Code>{}</Code>
    <Message>{}</Message>
    <Detail/>
  </Error>
  <RequestId>{}</RequestId>
</ErrorResponse>"#,
            self.code.as_str(),
            escape_xml(&self.message),
            request_id
        )
    }
}

impl From<QueueError> for ServiceError {
    fn from(e: QueueError) -> Self {
        let code = match &e {
            QueueError::QueueNotFound(_) => ErrorCode::NonExistentQueue,
            QueueError::QueueAlreadyExists(_) => ErrorCode::QueueAlreadyExists,
            QueueError::InvalidQueueName(_) | QueueError::InvalidParameter(_) => {
                ErrorCode::InvalidParameterValue
            }
            QueueError::ReceiptHandleInvalid(_) => ErrorCode::ReceiptHandleIsInvalid,
        };
        Self::new(code, e.to_string())
    }
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
