//! Messages and receive options

use md5::{Digest, Md5};
use serde::Serialize;
use sqslite_core::Params;

use crate::attribute::AttributeValue;
use crate::error::ErrorCause;
use crate::response::MessageEntry;

/// Compare `body` with the MD5 digest the service reported for it
///
/// An empty report is not checked.
pub(crate) fn check_md5(body: &str, reported: &str) -> Result<(), ErrorCause> {
    let expected = hex::encode(Md5::digest(body.as_bytes()));
    let actual = reported.trim();
    if actual.is_empty() || actual.eq_ignore_ascii_case(&expected) {
        return Ok(());
    }
    Err(ErrorCause::ChecksumMismatch {
        expected,
        actual: actual.to_string(),
    })
}

/// A message taken from a queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    /// Token used to delete the message or change its visibility
    pub receipt_handle: String,
    pub body: String,
    pub md5_of_body: String,
    pub attributes: Vec<AttributeValue>,
}

impl Message {
    /// Convert a decoded entry, rejecting a body that does not match its MD5
    pub(crate) fn from_entry(entry: MessageEntry) -> Result<Self, ErrorCause> {
        check_md5(&entry.body, &entry.md5_of_body)?;

        Ok(Self {
            id: entry.message_id,
            receipt_handle: entry.receipt_handle,
            body: entry.body,
            md5_of_body: entry.md5_of_body,
            attributes: entry
                .attributes
                .into_iter()
                .map(|a| AttributeValue {
                    name: a.name,
                    value: a.value,
                })
                .collect(),
        })
    }
}

/// Options for `ReceiveMessage`
#[derive(Debug, Clone, Default)]
pub struct ReceiveOptions {
    /// Upper bound on messages returned (the service caps it at 10)
    pub max_messages: Option<u32>,
    /// Seconds the received messages stay hidden from other receivers
    pub visibility_timeout: Option<u32>,
    /// Message attributes to return, e.g. `SenderId` or `All`
    pub attribute_names: Vec<String>,
}

impl ReceiveOptions {
    pub(crate) fn to_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(max) = self.max_messages {
            params.set("MaxNumberOfMessages", max.to_string());
        }
        if let Some(timeout) = self.visibility_timeout {
            params.set("VisibilityTimeout", timeout.to_string());
        }
        params.set_indexed("AttributeName", self.attribute_names.iter().map(String::as_str));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_is_checked() {
        assert!(check_md5("hello world", "5eb63bbbe01eeed093cb22bb8f5acdc3").is_ok());
        assert!(check_md5("hello world", "5EB63BBBE01EEED093CB22BB8F5ACDC3").is_ok());
        assert!(check_md5("hello world", "").is_ok());

        match check_md5("hello world ", "5eb63bbbe01eeed093cb22bb8f5acdc3") {
            Err(ErrorCause::ChecksumMismatch { expected, actual }) => {
                assert_ne!(expected, actual);
                assert_eq!(actual, "5eb63bbbe01eeed093cb22bb8f5acdc3");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_entry_with_wrong_md5_is_rejected() {
        let entry = MessageEntry {
            message_id: "1".into(),
            receipt_handle: "rh".into(),
            md5_of_body: "5eb63bbbe01eeed093cb22bb8f5acdc3".into(),
            body: "hello".into(),
            attributes: Vec::new(),
        };
        assert!(matches!(
            Message::from_entry(entry),
            Err(ErrorCause::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_default_options_send_nothing() {
        assert!(ReceiveOptions::default().to_params().is_empty());
    }

    #[test]
    fn test_receive_options_params() {
        let options = ReceiveOptions {
            max_messages: Some(5),
            visibility_timeout: Some(60),
            attribute_names: vec!["SenderId".into(), "SentTimestamp".into()],
        };

        let params = options.to_params();
        assert_eq!(params.get("MaxNumberOfMessages"), Some("5"));
        assert_eq!(params.get("VisibilityTimeout"), Some("60"));
        assert_eq!(params.get("AttributeName.1"), Some("SenderId"));
        assert_eq!(params.get("AttributeName.2"), Some("SentTimestamp"));
    }
}
