//! Response documents, one per operation
//!
//! Every success body has the shape
//!
//! ```text
//! <XResponse>
//!   <XResult>...</XResult>
//!   <ResponseMetadata><RequestId>...</RequestId></ResponseMetadata>
//! </XResponse>
//! ```
//!
//! Missing elements decode to empty values so an empty result set is not an
//! error.
//!
//! `ReceiveMessage` is read with an event reader instead of serde: the serde
//! deserializer trims text content and message bodies must come back exactly
//! as they were sent.

use quick_xml::events::Event;
use quick_xml::{DeError, Reader};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ErrorCause;

/// Decode an XML response body
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ErrorCause> {
    Ok(quick_xml::de::from_str(body)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct ResponseMetadata {
    pub request_id: String,
}

/// Body of calls that return nothing but metadata
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct EmptyResponse {
    pub response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct ListQueuesResponse {
    pub list_queues_result: ListQueuesResult,
    pub response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ListQueuesResult {
    #[serde(rename = "QueueUrl")]
    pub queue_urls: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct CreateQueueResponse {
    pub create_queue_result: CreateQueueResult,
    pub response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct CreateQueueResult {
    pub queue_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct GetQueueAttributesResponse {
    pub get_queue_attributes_result: GetQueueAttributesResult,
    pub response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GetQueueAttributesResult {
    #[serde(rename = "Attribute")]
    pub attributes: Vec<NameValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct NameValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct SendMessageResponse {
    pub send_message_result: SendMessageResult,
    pub response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct SendMessageResult {
    pub message_id: String,
    #[serde(rename = "MD5OfMessageBody")]
    pub md5_of_message_body: String,
}

#[derive(Debug, Default)]
pub(crate) struct ReceiveMessageResponse {
    pub receive_message_result: ReceiveMessageResult,
    pub response_metadata: ResponseMetadata,
}

#[derive(Debug, Default)]
pub(crate) struct ReceiveMessageResult {
    pub messages: Vec<MessageEntry>,
}

#[derive(Debug, Default)]
pub(crate) struct MessageEntry {
    pub message_id: String,
    pub receipt_handle: String,
    pub md5_of_body: String,
    /// Exactly as sent, surrounding whitespace included
    pub body: String,
    pub attributes: Vec<NameValue>,
}

impl ReceiveMessageResponse {
    /// Decode a `ReceiveMessage` body without trimming any text
    pub(crate) fn from_xml(body: &str) -> Result<Self, ErrorCause> {
        let mut reader = Reader::from_str(body);
        reader.trim_text(false).expand_empty_elements(true);

        let mut resp = Self::default();
        let mut path: Vec<String> = Vec::new();
        let mut text = String::new();
        let mut message = MessageEntry::default();
        let mut attribute = NameValue::default();
        let mut seen_root = false;

        loop {
            match reader.read_event().map_err(DeError::from)? {
                Event::Start(e) => {
                    seen_root = true;
                    path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    text.clear();
                }
                Event::Text(e) => text.push_str(&e.unescape().map_err(DeError::from)?),
                Event::CData(e) => text.push_str(std::str::from_utf8(&e).map_err(DeError::from)?),
                Event::End(_) => {
                    let value = std::mem::take(&mut text);
                    let Some(name) = path.pop() else {
                        return Err(DeError::Custom("unbalanced end tag".to_string()).into());
                    };

                    match (path.last().map(String::as_str), name.as_str()) {
                        (Some("Message"), "MessageId") => {
                            message.message_id = value.trim().to_string();
                        }
                        (Some("Message"), "ReceiptHandle") => {
                            message.receipt_handle = value.trim().to_string();
                        }
                        (Some("Message"), "MD5OfBody") => {
                            message.md5_of_body = value.trim().to_string();
                        }
                        (Some("Message"), "Body") => message.body = value,
                        (Some("Message"), "Attribute") => {
                            message.attributes.push(std::mem::take(&mut attribute));
                        }
                        (Some("Attribute"), "Name") => attribute.name = value.trim().to_string(),
                        (Some("Attribute"), "Value") => attribute.value = value.trim().to_string(),
                        (Some("ReceiveMessageResult"), "Message") => {
                            resp.receive_message_result
                                .messages
                                .push(std::mem::take(&mut message));
                        }
                        (Some("ResponseMetadata"), "RequestId") => {
                            resp.response_metadata.request_id = value.trim().to_string();
                        }
                        _ => {}
                    }
                }
                Event::Eof if seen_root && path.is_empty() => break,
                Event::Eof => return Err(DeError::UnexpectedEof.into()),
                _ => {}
            }
        }

        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_queues() {
        let body = r#"<ListQueuesResponse xmlns="http://queue.amazonaws.com/doc/2009-02-01/">
  <ListQueuesResult>
    <QueueUrl>https://sqs.us-east-1.amazonaws.com/123456789012/alpha</QueueUrl>
    <QueueUrl>https://sqs.us-east-1.amazonaws.com/123456789012/beta</QueueUrl>
  </ListQueuesResult>
  <ResponseMetadata><RequestId>725275ae-0b9b-4762-b238-436d7c65a1ac</RequestId></ResponseMetadata>
</ListQueuesResponse>"#;

        let resp: ListQueuesResponse = decode(body).unwrap();
        assert_eq!(
            resp.list_queues_result.queue_urls,
            vec![
                "https://sqs.us-east-1.amazonaws.com/123456789012/alpha",
                "https://sqs.us-east-1.amazonaws.com/123456789012/beta",
            ]
        );
        assert_eq!(
            resp.response_metadata.request_id,
            "725275ae-0b9b-4762-b238-436d7c65a1ac"
        );
    }

    #[test]
    fn test_empty_list_is_not_an_error() {
        let body = "<ListQueuesResponse><ListQueuesResult></ListQueuesResult>\
                    <ResponseMetadata><RequestId>x</RequestId></ResponseMetadata></ListQueuesResponse>";
        let resp: ListQueuesResponse = decode(body).unwrap();
        assert!(resp.list_queues_result.queue_urls.is_empty());

        let body = "<ListQueuesResponse><ResponseMetadata><RequestId>x</RequestId>\
                    </ResponseMetadata></ListQueuesResponse>";
        let resp: ListQueuesResponse = decode(body).unwrap();
        assert!(resp.list_queues_result.queue_urls.is_empty());
    }

    #[test]
    fn test_queue_attributes_keep_order() {
        let body = "<GetQueueAttributesResponse><GetQueueAttributesResult>\
                    <Attribute><Name>VisibilityTimeout</Name><Value>30</Value></Attribute>\
                    <Attribute><Name>ApproximateNumberOfMessages</Name><Value>1</Value></Attribute>\
                    </GetQueueAttributesResult><ResponseMetadata><RequestId>766ee54d</RequestId>\
                    </ResponseMetadata></GetQueueAttributesResponse>";

        let resp: GetQueueAttributesResponse = decode(body).unwrap();
        let pairs: Vec<(&str, &str)> = resp
            .get_queue_attributes_result
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("VisibilityTimeout", "30"), ("ApproximateNumberOfMessages", "1")]
        );
    }

    #[test]
    fn test_receive_message() {
        let body = "<ReceiveMessageResponse><ReceiveMessageResult><Message>\
                    <MessageId>5fea7756-0ea4-451a-a703-a558b933e274</MessageId>\
                    <ReceiptHandle>MbZj6wDWli+JvwwJaBV</ReceiptHandle>\
                    <MD5OfBody>5eb63bbbe01eeed093cb22bb8f5acdc3</MD5OfBody>\
                    <Body>hello world</Body>\
                    <Attribute><Name>SenderId</Name><Value>195004372649</Value></Attribute>\
                    </Message></ReceiveMessageResult>\
                    <ResponseMetadata><RequestId>b6633655</RequestId></ResponseMetadata>\
                    </ReceiveMessageResponse>";

        let resp = ReceiveMessageResponse::from_xml(body).unwrap();
        let messages = resp.receive_message_result.messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_id, "5fea7756-0ea4-451a-a703-a558b933e274");
        assert_eq!(messages[0].receipt_handle, "MbZj6wDWli+JvwwJaBV");
        assert_eq!(messages[0].md5_of_body, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(messages[0].body, "hello world");
        assert_eq!(messages[0].attributes[0].name, "SenderId");
    }

    #[test]
    fn test_receive_from_empty_queue() {
        let body = r#"<?xml version="1.0"?>
<ReceiveMessageResponse xmlns="http://queue.amazonaws.com/doc/2009-02-01/"><ReceiveMessageResult></ReceiveMessageResult><ResponseMetadata><RequestId>29faed75-f44b-4424-a3dd-1beb1439c13a</RequestId></ResponseMetadata></ReceiveMessageResponse>"#;

        let resp = ReceiveMessageResponse::from_xml(body).unwrap();
        assert!(resp.receive_message_result.messages.is_empty());
        assert_eq!(
            resp.response_metadata.request_id,
            "29faed75-f44b-4424-a3dd-1beb1439c13a"
        );
    }

    #[test]
    fn test_escaped_body_is_unescaped() {
        let body = "<ReceiveMessageResponse><ReceiveMessageResult><Message>\
                    <MessageId>1</MessageId><Body>a &lt;b&gt; &amp; c</Body>\
                    </Message></ReceiveMessageResult></ReceiveMessageResponse>";

        let resp = ReceiveMessageResponse::from_xml(body).unwrap();
        assert_eq!(resp.receive_message_result.messages[0].body, "a <b> & c");
    }

    #[test]
    fn test_body_whitespace_is_kept() {
        let body = "<ReceiveMessageResponse><ReceiveMessageResult>\
                    <Message><MessageId>1</MessageId><Body>  padded  </Body></Message>\
                    <Message><MessageId>2</MessageId><Body>\t</Body></Message>\
                    <Message><MessageId>3</MessageId><Body>line\n</Body></Message>\
                    <Message><MessageId>4</MessageId><Body/></Message>\
                    </ReceiveMessageResult></ReceiveMessageResponse>";

        let resp = ReceiveMessageResponse::from_xml(body).unwrap();
        let bodies: Vec<&str> = resp
            .receive_message_result
            .messages
            .iter()
            .map(|m| m.body.as_str())
            .collect();
        assert_eq!(bodies, vec!["  padded  ", "\t", "line\n", ""]);
    }

    #[test]
    fn test_indented_receive_document() {
        let body = r#"<?xml version="1.0"?>
<ReceiveMessageResponse xmlns="http://queue.amazonaws.com/doc/2009-02-01/">
  <ReceiveMessageResult>
    <Message>
      <MessageId>5fea7756</MessageId>
      <ReceiptHandle>MbZj6wDWli</ReceiptHandle>
      <MD5OfBody>fafb00f5732ab283681e124bf8747ed1</MD5OfBody>
      <Body><![CDATA[ raw <text> ]]></Body>
      <Attribute>
        <Name>SenderId</Name>
        <Value>195004372649</Value>
      </Attribute>
    </Message>
  </ReceiveMessageResult>
  <ResponseMetadata>
    <RequestId>b6633655</RequestId>
  </ResponseMetadata>
</ReceiveMessageResponse>"#;

        let resp = ReceiveMessageResponse::from_xml(body).unwrap();
        let message = &resp.receive_message_result.messages[0];
        assert_eq!(message.message_id, "5fea7756");
        assert_eq!(message.receipt_handle, "MbZj6wDWli");
        assert_eq!(message.body, " raw <text> ");
        assert_eq!(message.attributes[0].name, "SenderId");
        assert_eq!(message.attributes[0].value, "195004372649");
        assert_eq!(resp.response_metadata.request_id, "b6633655");
    }

    #[test]
    fn test_truncated_receive_is_decode_error() {
        let result = ReceiveMessageResponse::from_xml(
            "<ReceiveMessageResponse><ReceiveMessageResult><Message><Body>x</Body>",
        );
        assert!(matches!(result, Err(ErrorCause::Xml(_))));

        assert!(matches!(
            ReceiveMessageResponse::from_xml(""),
            Err(ErrorCause::Xml(_))
        ));
    }

    #[test]
    fn test_send_message_result() {
        let body = "<SendMessageResponse><SendMessageResult>\
                    <MD5OfMessageBody>5eb63bbbe01eeed093cb22bb8f5acdc3</MD5OfMessageBody>\
                    <MessageId>27daac76-34dd-47df-bd01-1f6e873584a0</MessageId>\
                    </SendMessageResult><ResponseMetadata><RequestId>r</RequestId>\
                    </ResponseMetadata></SendMessageResponse>";

        let resp: SendMessageResponse = decode(body).unwrap();
        assert_eq!(
            resp.send_message_result.message_id,
            "27daac76-34dd-47df-bd01-1f6e873584a0"
        );
        assert_eq!(
            resp.send_message_result.md5_of_message_body,
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let result: Result<CreateQueueResponse, _> =
            decode("<CreateQueueResponse><CreateQueueResult><QueueUrl>x</CreateQueueResult>");
        assert!(matches!(result, Err(ErrorCause::Xml(_))));
    }
}
