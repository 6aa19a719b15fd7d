//! Queue attributes

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A queue attribute that can be requested or set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Request every attribute
    All,
    ApproximateNumberOfMessages,
    ApproximateNumberOfMessagesNotVisible,
    VisibilityTimeout,
    CreatedTimestamp,
    LastModifiedTimestamp,
    Policy,
    MaximumMessageSize,
    MessageRetentionPeriod,
    QueueArn,
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::ApproximateNumberOfMessages => "ApproximateNumberOfMessages",
            Self::ApproximateNumberOfMessagesNotVisible => "ApproximateNumberOfMessagesNotVisible",
            Self::VisibilityTimeout => "VisibilityTimeout",
            Self::CreatedTimestamp => "CreatedTimestamp",
            Self::LastModifiedTimestamp => "LastModifiedTimestamp",
            Self::Policy => "Policy",
            Self::MaximumMessageSize => "MaximumMessageSize",
            Self::MessageRetentionPeriod => "MessageRetentionPeriod",
            Self::QueueArn => "QueueArn",
        }
    }

    pub const ALL: [Attribute; 10] = [
        Self::All,
        Self::ApproximateNumberOfMessages,
        Self::ApproximateNumberOfMessagesNotVisible,
        Self::VisibilityTimeout,
        Self::CreatedTimestamp,
        Self::LastModifiedTimestamp,
        Self::Policy,
        Self::MaximumMessageSize,
        Self::MessageRetentionPeriod,
        Self::QueueArn,
    ];
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown queue attribute: {0}")]
pub struct UnknownAttribute(pub String);

impl FromStr for Attribute {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|a| a.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownAttribute(s.to_string()))
    }
}

/// One attribute as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeValue {
    pub name: String,
    pub value: String,
}

/// Attributes of a queue, in the order the service listed them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueAttributes {
    pub request_id: String,
    pub attributes: Vec<AttributeValue>,
}

impl QueueAttributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}
