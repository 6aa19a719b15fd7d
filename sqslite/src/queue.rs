//! Operations on a single queue

use sqslite_core::Params;
use tracing::{debug, info};

use crate::attribute::{Attribute, AttributeValue, QueueAttributes};
use crate::client::Sqs;
use crate::error::SqsError;
use crate::message::{check_md5, Message, ReceiveOptions};
use crate::response::{
    EmptyResponse, GetQueueAttributesResponse, ReceiveMessageResponse, SendMessageResponse,
};

/// Permission granted to another account by `AddPermission`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub account_id: String,
    /// Action name such as `SendMessage`, or `*`
    pub action: String,
}

impl Grant {
    pub fn new(account_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            action: action.into(),
        }
    }
}

/// Handle to one queue, addressed by its resource path
#[derive(Debug, Clone)]
pub struct Queue {
    sqs: Sqs,
    path: String,
}

impl Queue {
    pub(crate) fn new(sqs: Sqs, path: String) -> Self {
        Self { sqs, path }
    }

    /// Resource path, e.g. `/123456789012/orders`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Queue name: the last segment of the resource path
    pub fn name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    pub fn url(&self) -> String {
        format!(
            "{}{}",
            self.sqs.context().region.sqs_endpoint().trim_end_matches('/'),
            self.path
        )
    }

    pub fn delete(&self) -> Result<(), SqsError> {
        let _: EmptyResponse = self.sqs.get("DeleteQueue", &self.path, Params::new())?;
        info!(path = %self.path, "Deleted queue");
        Ok(())
    }

    /// Read attributes, `Attribute::All` for every one
    pub fn attributes(&self, attrs: &[Attribute]) -> Result<QueueAttributes, SqsError> {
        let mut params = Params::new();
        params.set_indexed("AttributeName", attrs.iter().map(Attribute::as_str));

        let resp: GetQueueAttributesResponse =
            self.sqs.get("GetQueueAttributes", &self.path, params)?;
        Ok(QueueAttributes {
            request_id: resp.response_metadata.request_id,
            attributes: resp
                .get_queue_attributes_result
                .attributes
                .into_iter()
                .map(|a| AttributeValue {
                    name: a.name,
                    value: a.value,
                })
                .collect(),
        })
    }

    pub fn set_attribute(&self, attr: Attribute, value: &str) -> Result<(), SqsError> {
        let mut params = Params::new();
        params
            .set("Attribute.Name", attr.as_str())
            .set("Attribute.Value", value);

        let _: EmptyResponse = self.sqs.get("SetQueueAttributes", &self.path, params)?;
        Ok(())
    }

    /// Send a message and return the id the service assigned to it
    ///
    /// Always a POST: message bodies quickly outgrow URL length limits.
    pub fn send_message(&self, body: &str) -> Result<String, SqsError> {
        let mut params = Params::new();
        params.set("MessageBody", body);

        let resp: SendMessageResponse = self.sqs.post("SendMessage", &self.path, params)?;
        let result = resp.send_message_result;

        check_md5(body, &result.md5_of_message_body)?;

        debug!(path = %self.path, message_id = %result.message_id, "Sent message");
        Ok(result.message_id)
    }

    /// Receive one message, `None` when none is available
    pub fn receive_message(&self) -> Result<Option<Message>, SqsError> {
        Ok(self
            .receive_messages(&ReceiveOptions::default())?
            .into_iter()
            .next())
    }

    /// Receive up to `options.max_messages` messages
    ///
    /// Each body is checked against its reported MD5; a mismatch fails the
    /// whole call.
    pub fn receive_messages(&self, options: &ReceiveOptions) -> Result<Vec<Message>, SqsError> {
        let resp = self.sqs.get_with(
            "ReceiveMessage",
            &self.path,
            options.to_params(),
            ReceiveMessageResponse::from_xml,
        )?;

        resp.receive_message_result
            .messages
            .into_iter()
            .filter(|m| !m.message_id.is_empty())
            .map(|entry| Message::from_entry(entry).map_err(SqsError::from))
            .collect()
    }

    pub fn delete_message(&self, receipt_handle: &str) -> Result<(), SqsError> {
        let mut params = Params::new();
        params.set("ReceiptHandle", receipt_handle);

        let _: EmptyResponse = self.sqs.get("DeleteMessage", &self.path, params)?;
        Ok(())
    }

    pub fn change_message_visibility(
        &self,
        receipt_handle: &str,
        visibility_timeout: u32,
    ) -> Result<(), SqsError> {
        let mut params = Params::new();
        params
            .set("ReceiptHandle", receipt_handle)
            .set("VisibilityTimeout", visibility_timeout.to_string());

        let _: EmptyResponse = self
            .sqs
            .get("ChangeMessageVisibility", &self.path, params)?;
        Ok(())
    }

    pub fn add_permission(&self, label: &str, grants: &[Grant]) -> Result<(), SqsError> {
        let mut params = Params::new();
        params.set("Label", label);
        params.set_indexed("AWSAccountId", grants.iter().map(|g| g.account_id.as_str()));
        params.set_indexed("ActionName", grants.iter().map(|g| g.action.as_str()));

        let _: EmptyResponse = self.sqs.get("AddPermission", &self.path, params)?;
        Ok(())
    }

    pub fn remove_permission(&self, label: &str) -> Result<(), SqsError> {
        let mut params = Params::new();
        params.set("Label", label);

        let _: EmptyResponse = self.sqs.get("RemovePermission", &self.path, params)?;
        Ok(())
    }
}
