//! Blocking HTTP executor

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{build_error, ErrorCause, SqsError};
use crate::request::SignedRequest;
use crate::response::decode;

/// Issues signed requests and routes responses to the decoder or the error
/// builder
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    debug: bool,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self, SqsError> {
        // Redirects are reported, not followed: a re-issued request would
        // carry a stale signature.
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ErrorCause::Http)?;

        Ok(Self {
            client,
            debug: config.debug,
        })
    }

    /// Send `request` and decode a success body into `T`
    ///
    /// The response is consumed on every path, so its connection goes back
    /// to the client before this returns.
    pub fn execute<T: DeserializeOwned>(
        &self,
        action: &str,
        request: SignedRequest,
    ) -> Result<T, SqsError> {
        self.execute_with(action, request, decode::<T>)
    }

    /// Like [`Transport::execute`], with a caller-supplied body decoder
    pub fn execute_with<T>(
        &self,
        action: &str,
        request: SignedRequest,
        decode: impl FnOnce(&str) -> Result<T, ErrorCause>,
    ) -> Result<T, SqsError> {
        let (status, body) = self.send(action, request)?;

        decode(&body).map_err(|cause| {
            warn!(action = %action, error = %cause, "Failed to decode response");
            SqsError::from(cause).with_status(status.as_u16(), reason(status))
        })
    }

    fn send(
        &self,
        action: &str,
        request: SignedRequest,
    ) -> Result<(reqwest::StatusCode, String), SqsError> {
        debug!(
            action = %action,
            method = request.method.as_str(),
            path = %request.url.path(),
            "SQS request"
        );
        if self.debug {
            debug!(url = %request.url, body = ?request.body, "Request dump");
        }

        let mut builder = self.client.request(request.method.into(), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().map_err(|e| {
            warn!(action = %action, error = %e, "SQS request failed");
            SqsError::from(ErrorCause::Http(e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.service_error(action, response));
        }

        let body = response.text().map_err(|e| {
            SqsError::from(ErrorCause::Http(e)).with_status(status.as_u16(), reason(status))
        })?;

        if self.debug {
            debug!(status = status.as_u16(), body = %body, "Response dump");
        }
        Ok((status, body))
    }

    fn service_error(&self, action: &str, response: Response) -> SqsError {
        let status = response.status();

        let error = match response.text() {
            Ok(body) => {
                if self.debug {
                    debug!(status = status.as_u16(), body = %body, "Error response dump");
                }
                build_error(status.as_u16(), reason(status), &body)
            }
            Err(e) => SqsError::from(ErrorCause::Http(e)).with_status(status.as_u16(), reason(status)),
        };

        warn!(
            action = %action,
            status = status.as_u16(),
            code = %error.code,
            request_id = %error.request_id,
            "SQS error response"
        );
        error
    }
}

fn reason(status: reqwest::StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}
