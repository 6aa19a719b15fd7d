//! In-memory queue storage

use dashmap::DashMap;
use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;
use tracing::info;

use crate::ACCOUNT_ID;

static QUEUE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,80}$").expect("valid queue name pattern"));

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue does not exist: {0}")]
    QueueNotFound(String),
    #[error("Queue already exists with different attributes: {0}")]
    QueueAlreadyExists(String),
    #[error("Invalid queue name: {0}")]
    InvalidQueueName(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Receipt handle is invalid: {0}")]
    ReceiptHandleInvalid(String),
}

#[derive(Debug, Clone)]
pub struct Queue {
    pub name: String,
    pub url: String,
    pub arn: String,
    pub created_timestamp: i64,
    pub last_modified_timestamp: i64,
    pub visibility_timeout: u32,
    pub maximum_message_size: u32,
    pub message_retention_period: u32,
    /// Label -> (account id, action) grants
    pub permissions: BTreeMap<String, Vec<(String, String)>>,
}

impl Queue {
    pub fn new(base_url: &str, name: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            url: format!("{}/{}/{}", base_url, ACCOUNT_ID, name),
            arn: format!("arn:aws:sqs:us-east-1:{}:{}", ACCOUNT_ID, name),
            name,
            created_timestamp: now,
            last_modified_timestamp: now,
            visibility_timeout: 30,
            maximum_message_size: 262144,     // 256KB
            message_retention_period: 345600, // 4 days
            permissions: BTreeMap::new(),
        }
    }

    /// Access policy document built from the granted permissions
    pub fn policy(&self) -> Option<String> {
        if self.permissions.is_empty() {
            return None;
        }

        let statements: Vec<serde_json::Value> = self
            .permissions
            .iter()
            .map(|(label, grants)| {
                let accounts: Vec<&str> = grants.iter().map(|(a, _)| a.as_str()).collect();
                let actions: Vec<String> =
                    grants.iter().map(|(_, action)| format!("SQS:{}", action)).collect();
                serde_json::json!({
                    "Sid": label,
                    "Effect": "Allow",
                    "Principal": { "AWS": accounts },
                    "Action": actions,
                    "Resource": self.arn,
                })
            })
            .collect();

        Some(
            serde_json::json!({
                "Version": "2008-10-17",
                "Id": format!("{}/SQSDefaultPolicy", self.arn),
                "Statement": statements,
            })
            .to_string(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub message_id: String,
    pub receipt_handle: Option<String>,
    pub body: String,
    pub md5_of_body: String,
    pub sent_timestamp: i64,
    pub approximate_receive_count: u32,
    pub approximate_first_receive_timestamp: Option<i64>,
    /// Millisecond timestamp before which the message stays hidden
    pub visible_after: i64,
}

impl Message {
    pub fn new(body: String) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            receipt_handle: None,
            md5_of_body: md5_hex(&body),
            body,
            sent_timestamp: chrono::Utc::now().timestamp_millis(),
            approximate_receive_count: 0,
            approximate_first_receive_timestamp: None,
            visible_after: 0,
        }
    }

    fn is_visible(&self, now: i64) -> bool {
        self.visible_after <= now
    }
}

pub fn md5_hex(body: &str) -> String {
    hex::encode(Md5::digest(body.as_bytes()))
}

/// Queue attributes accepted by `CreateQueue`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSettings {
    pub visibility_timeout: Option<u32>,
    pub maximum_message_size: Option<u32>,
}

#[derive(Debug)]
pub struct SqsStorage {
    base_url: String,
    queues: DashMap<String, Queue>,
    messages: DashMap<String, VecDeque<Message>>,
}

impl SqsStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            queues: DashMap::new(),
            messages: DashMap::new(),
        }
    }

    /// Create a queue, or return the existing one when the settings agree
    pub fn create_queue(&self, name: &str, settings: &QueueSettings) -> Result<Queue, QueueError> {
        if !QUEUE_NAME.is_match(name) {
            return Err(QueueError::InvalidQueueName(name.to_string()));
        }

        if let Some(existing) = self.queues.get(name) {
            let conflicts = settings
                .visibility_timeout
                .is_some_and(|v| v != existing.visibility_timeout)
                || settings
                    .maximum_message_size
                    .is_some_and(|v| v != existing.maximum_message_size);
            if conflicts {
                return Err(QueueError::QueueAlreadyExists(name.to_string()));
            }
            return Ok(existing.value().clone());
        }

        let mut queue = Queue::new(&self.base_url, name.to_string());
        if let Some(timeout) = settings.visibility_timeout {
            queue.visibility_timeout = timeout;
        }
        if let Some(size) = settings.maximum_message_size {
            queue.maximum_message_size = size;
        }

        info!(name = %name, url = %queue.url, "Creating queue");
        self.queues.insert(name.to_string(), queue.clone());
        self.messages.insert(name.to_string(), VecDeque::new());
        Ok(queue)
    }

    pub fn delete_queue(&self, name: &str) -> Result<(), QueueError> {
        if self.queues.remove(name).is_none() {
            return Err(QueueError::QueueNotFound(name.to_string()));
        }

        info!(name = %name, "Deleting queue");
        self.messages.remove(name);
        Ok(())
    }

    pub fn get_queue(&self, name: &str) -> Result<Queue, QueueError> {
        self.queues
            .get(name)
            .map(|q| q.value().clone())
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))
    }

    /// Queue URLs sorted by name
    pub fn list_queues(&self, prefix: Option<&str>) -> Vec<String> {
        let mut queues: Vec<(String, String)> = self
            .queues
            .iter()
            .filter(|q| prefix.map_or(true, |p| q.key().starts_with(p)))
            .map(|q| (q.key().clone(), q.value().url.clone()))
            .collect();
        queues.sort();
        queues.into_iter().map(|(_, url)| url).collect()
    }

    pub fn set_attribute(&self, name: &str, attribute: &str, value: &str) -> Result<(), QueueError> {
        let mut queue = self
            .queues
            .get_mut(name)
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))?;

        let parsed = || {
            value
                .parse::<u32>()
                .map_err(|_| QueueError::InvalidParameter(format!("{}={}", attribute, value)))
        };
        match attribute {
            "VisibilityTimeout" => queue.visibility_timeout = parsed()?,
            "MaximumMessageSize" => queue.maximum_message_size = parsed()?,
            "MessageRetentionPeriod" => queue.message_retention_period = parsed()?,
            other => {
                return Err(QueueError::InvalidParameter(format!(
                    "attribute {} cannot be set",
                    other
                )))
            }
        }
        queue.last_modified_timestamp = chrono::Utc::now().timestamp();
        Ok(())
    }

    /// Visible and in-flight message counts
    pub fn message_counts(&self, name: &str) -> Result<(usize, usize), QueueError> {
        let messages = self
            .messages
            .get(name)
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))?;

        let now = chrono::Utc::now().timestamp_millis();
        let visible = messages.iter().filter(|m| m.is_visible(now)).count();
        Ok((visible, messages.len() - visible))
    }

    pub fn send_message(&self, queue_name: &str, body: String) -> Result<Message, QueueError> {
        let queue = self.get_queue(queue_name)?;
        if body.len() > queue.maximum_message_size as usize {
            return Err(QueueError::InvalidParameter(format!(
                "message of {} bytes exceeds {} bytes",
                body.len(),
                queue.maximum_message_size
            )));
        }

        let message = Message::new(body);
        if let Some(mut msgs) = self.messages.get_mut(queue_name) {
            msgs.push_back(message.clone());
        }

        info!(queue = %queue_name, message_id = %message.message_id, "Sent message");
        Ok(message)
    }

    /// Hand out up to `max_messages` visible messages and hide them for the
    /// visibility timeout
    pub fn receive_message(
        &self,
        queue_name: &str,
        max_messages: u32,
        visibility_timeout: Option<u32>,
    ) -> Result<Vec<Message>, QueueError> {
        let queue = self.get_queue(queue_name)?;
        let timeout = visibility_timeout.unwrap_or(queue.visibility_timeout);
        let max = max_messages.clamp(1, 10) as usize;
        let now = chrono::Utc::now().timestamp_millis();

        let mut result = Vec::new();
        if let Some(mut messages) = self.messages.get_mut(queue_name) {
            for msg in messages.iter_mut().filter(|m| m.is_visible(now)).take(max) {
                msg.approximate_receive_count += 1;
                msg.approximate_first_receive_timestamp.get_or_insert(now);
                msg.receipt_handle = Some(uuid::Uuid::new_v4().to_string());
                msg.visible_after = now + i64::from(timeout) * 1000;
                result.push(msg.clone());
            }
        }

        info!(queue = %queue_name, count = result.len(), "Received messages");
        Ok(result)
    }

    pub fn delete_message(&self, queue_name: &str, receipt_handle: &str) -> Result<(), QueueError> {
        let mut messages = self
            .messages
            .get_mut(queue_name)
            .ok_or_else(|| QueueError::QueueNotFound(queue_name.to_string()))?;

        let original_len = messages.len();
        messages.retain(|m| m.receipt_handle.as_deref() != Some(receipt_handle));

        if messages.len() == original_len {
            return Err(QueueError::ReceiptHandleInvalid(receipt_handle.to_string()));
        }

        info!(queue = %queue_name, receipt = %receipt_handle, "Deleted message");
        Ok(())
    }

    pub fn change_message_visibility(
        &self,
        queue_name: &str,
        receipt_handle: &str,
        visibility_timeout: u32,
    ) -> Result<(), QueueError> {
        let mut messages = self
            .messages
            .get_mut(queue_name)
            .ok_or_else(|| QueueError::QueueNotFound(queue_name.to_string()))?;

        let message = messages
            .iter_mut()
            .find(|m| m.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| QueueError::ReceiptHandleInvalid(receipt_handle.to_string()))?;

        message.visible_after =
            chrono::Utc::now().timestamp_millis() + i64::from(visibility_timeout) * 1000;
        Ok(())
    }

    pub fn add_permission(
        &self,
        queue_name: &str,
        label: &str,
        grants: Vec<(String, String)>,
    ) -> Result<(), QueueError> {
        let mut queue = self
            .queues
            .get_mut(queue_name)
            .ok_or_else(|| QueueError::QueueNotFound(queue_name.to_string()))?;

        if grants.is_empty() {
            return Err(QueueError::InvalidParameter(
                "at least one account and action is required".to_string(),
            ));
        }
        if queue.permissions.contains_key(label) {
            return Err(QueueError::InvalidParameter(format!(
                "label {} already exists",
                label
            )));
        }

        queue.permissions.insert(label.to_string(), grants);
        queue.last_modified_timestamp = chrono::Utc::now().timestamp();
        Ok(())
    }

    pub fn remove_permission(&self, queue_name: &str, label: &str) -> Result<(), QueueError> {
        let mut queue = self
            .queues
            .get_mut(queue_name)
            .ok_or_else(|| QueueError::QueueNotFound(queue_name.to_string()))?;

        if queue.permissions.remove(label).is_none() {
            return Err(QueueError::InvalidParameter(format!(
                "label {} does not exist",
                label
            )));
        }
        queue.last_modified_timestamp = chrono::Utc::now().timestamp();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SqsStorage {
        SqsStorage::new("http://localhost:9324")
    }

    #[test]
    fn test_create_and_list() {
        let storage = storage();
        let queue = storage
            .create_queue("test-queue", &QueueSettings::default())
            .unwrap();
        storage.create_queue("other", &QueueSettings::default()).unwrap();

        assert_eq!(queue.url, "http://localhost:9324/000000000000/test-queue");
        assert_eq!(storage.list_queues(Some("test")), vec![queue.url.clone()]);
        assert_eq!(storage.list_queues(None).len(), 2);
    }

    #[test]
    fn test_create_is_idempotent_unless_settings_conflict() {
        let storage = storage();
        let settings = QueueSettings {
            visibility_timeout: Some(45),
            maximum_message_size: None,
        };
        storage.create_queue("q", &settings).unwrap();
        assert!(storage.create_queue("q", &settings).is_ok());

        let conflicting = QueueSettings {
            visibility_timeout: Some(10),
            maximum_message_size: None,
        };
        assert!(matches!(
            storage.create_queue("q", &conflicting),
            Err(QueueError::QueueAlreadyExists(_))
        ));
    }

    #[test]
    fn test_invalid_queue_name() {
        let storage = storage();
        assert!(matches!(
            storage.create_queue("bad name!", &QueueSettings::default()),
            Err(QueueError::InvalidQueueName(_))
        ));
    }

    #[test]
    fn test_received_message_is_hidden_until_deleted() {
        let storage = storage();
        storage.create_queue("q", &QueueSettings::default()).unwrap();
        let sent = storage.send_message("q", "hello world".to_string()).unwrap();
        assert_eq!(sent.md5_of_body, "5eb63bbbe01eeed093cb22bb8f5acdc3");

        let received = storage.receive_message("q", 1, None).unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].body, "hello world");
        assert_eq!(received[0].approximate_receive_count, 1);
        assert_eq!(storage.message_counts("q").unwrap(), (0, 1));

        assert!(storage.receive_message("q", 1, None).unwrap().is_empty());

        let handle = received[0].receipt_handle.clone().unwrap();
        storage.delete_message("q", &handle).unwrap();
        assert_eq!(storage.message_counts("q").unwrap(), (0, 0));
        assert!(matches!(
            storage.delete_message("q", &handle),
            Err(QueueError::ReceiptHandleInvalid(_))
        ));
    }

    #[test]
    fn test_zero_visibility_makes_message_visible_again() {
        let storage = storage();
        storage.create_queue("q", &QueueSettings::default()).unwrap();
        storage.send_message("q", "again".to_string()).unwrap();

        let first = storage.receive_message("q", 1, None).unwrap();
        let handle = first[0].receipt_handle.clone().unwrap();
        storage.change_message_visibility("q", &handle, 0).unwrap();

        let second = storage.receive_message("q", 1, None).unwrap();
        assert_eq!(second[0].message_id, first[0].message_id);
        assert_eq!(second[0].approximate_receive_count, 2);
    }

    #[test]
    fn test_message_size_limit() {
        let storage = storage();
        let settings = QueueSettings {
            visibility_timeout: None,
            maximum_message_size: Some(4),
        };
        storage.create_queue("small", &settings).unwrap();
        assert!(storage.send_message("small", "1234".to_string()).is_ok());
        assert!(matches!(
            storage.send_message("small", "12345".to_string()),
            Err(QueueError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_permissions_render_policy() {
        let storage = storage();
        storage.create_queue("q", &QueueSettings::default()).unwrap();
        assert!(storage.get_queue("q").unwrap().policy().is_none());

        storage
            .add_permission(
                "q",
                "send-only",
                vec![("123456789012".to_string(), "SendMessage".to_string())],
            )
            .unwrap();
        let policy = storage.get_queue("q").unwrap().policy().unwrap();
        assert!(policy.contains("send-only"));
        assert!(policy.contains("SQS:SendMessage"));

        storage.remove_permission("q", "send-only").unwrap();
        assert!(storage.get_queue("q").unwrap().policy().is_none());
        assert!(storage.remove_permission("q", "send-only").is_err());
    }

    #[test]
    fn test_delete_queue() {
        let storage = storage();
        storage.create_queue("q", &QueueSettings::default()).unwrap();
        storage.delete_queue("q").unwrap();
        assert!(matches!(
            storage.delete_queue("q"),
            Err(QueueError::QueueNotFound(_))
        ));
        assert!(storage.list_queues(None).is_empty());
    }
}
