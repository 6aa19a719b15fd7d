//! Service client and queue lifecycle operations

use chrono::Utc;
use serde::de::DeserializeOwned;
use sqslite_core::{Credentials, Params, Region};
use std::sync::Arc;
use tracing::info;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ErrorCause, SqsError};
use crate::queue::Queue;
use crate::request::{build_request, Method};
use crate::response::{CreateQueueResponse, ListQueuesResponse};
use crate::transport::Transport;

/// Credentials and region shared by every call
#[derive(Debug)]
pub struct Context {
    pub credentials: Credentials,
    pub region: Region,
}

/// Optional settings for `CreateQueue`
#[derive(Debug, Clone, Default)]
pub struct CreateQueueOptions {
    pub default_visibility_timeout: Option<u32>,
    pub maximum_message_size: Option<u32>,
}

/// Client for the queue service in one region
///
/// Cloning is cheap; clones share the context and the HTTP client.
#[derive(Debug, Clone)]
pub struct Sqs {
    context: Arc<Context>,
    transport: Transport,
}

impl Sqs {
    pub fn new(credentials: Credentials, region: Region) -> Result<Self, SqsError> {
        Self::with_config(credentials, region, ClientConfig::default())
    }

    pub fn with_config(
        credentials: Credentials,
        region: Region,
        config: ClientConfig,
    ) -> Result<Self, SqsError> {
        Ok(Self {
            context: Arc::new(Context {
                credentials,
                region,
            }),
            transport: Transport::new(&config)?,
        })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub(crate) fn get<T: DeserializeOwned>(
        &self,
        action: &str,
        path: &str,
        params: Params,
    ) -> Result<T, SqsError> {
        self.call(Method::Get, action, path, params)
    }

    pub(crate) fn post<T: DeserializeOwned>(
        &self,
        action: &str,
        path: &str,
        params: Params,
    ) -> Result<T, SqsError> {
        self.call(Method::Post, action, path, params)
    }

    /// GET whose success body needs its own decoder
    pub(crate) fn get_with<T>(
        &self,
        action: &str,
        path: &str,
        params: Params,
        decode: impl FnOnce(&str) -> Result<T, ErrorCause>,
    ) -> Result<T, SqsError> {
        let request = build_request(&self.context, Method::Get, action, path, params, Utc::now())?;
        self.transport.execute_with(action, request, decode)
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        action: &str,
        path: &str,
        params: Params,
    ) -> Result<T, SqsError> {
        let request = build_request(&self.context, method, action, path, params, Utc::now())?;
        self.transport.execute(action, request)
    }

    /// Handle for the queue behind a service-assigned URL
    fn queue_from_url(&self, queue_url: &str) -> Result<Queue, SqsError> {
        let url = Url::parse(queue_url.trim()).map_err(|source| ErrorCause::InvalidQueueUrl {
            url: queue_url.to_string(),
            source,
        })?;
        Ok(Queue::new(self.clone(), url.path().to_string()))
    }

    /// List queues, optionally only those whose name starts with `prefix`
    pub fn list_queues(&self, prefix: Option<&str>) -> Result<Vec<Queue>, SqsError> {
        let mut params = Params::new();
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            params.set("QueueNamePrefix", prefix);
        }

        let resp: ListQueuesResponse = self.get("ListQueues", "/", params)?;
        resp.list_queues_result
            .queue_urls
            .iter()
            .map(|url| self.queue_from_url(url))
            .collect()
    }

    /// Find a queue by exact name
    pub fn queue(&self, name: &str) -> Result<Option<Queue>, SqsError> {
        Ok(self
            .list_queues(Some(name))?
            .into_iter()
            .find(|q| q.name() == name))
    }

    pub fn create_queue(
        &self,
        name: &str,
        options: Option<&CreateQueueOptions>,
    ) -> Result<Queue, SqsError> {
        let mut params = Params::new();
        params.set("QueueName", name);
        if let Some(options) = options {
            if let Some(timeout) = options.default_visibility_timeout {
                params.set("DefaultVisibilityTimeout", timeout.to_string());
            }
            if let Some(size) = options.maximum_message_size {
                params.set("MaximumMessageSize", size.to_string());
            }
        }

        let resp: CreateQueueResponse = self.get("CreateQueue", "/", params)?;
        let queue = self.queue_from_url(&resp.create_queue_result.queue_url)?;
        info!(name = %name, path = %queue.path(), "Created queue");
        Ok(queue)
    }
}
