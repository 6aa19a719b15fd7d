//! Signed request construction

use chrono::{DateTime, Utc};
use sqslite_core::{Params, API_VERSION, TIMESTAMP_FORMAT};
use url::Url;

use crate::client::Context;
use crate::error::{ErrorCause, SqsError};

/// HTTP verb used for a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Parameters in the query string
    Get,
    /// Parameters in a form-encoded body
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

/// A request ready to go on the wire
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Resolve the request URL: queue endpoint plus resource path
fn target_url(context: &Context, path: &str) -> Result<Url, ErrorCause> {
    if !path.starts_with('/') {
        return Err(ErrorCause::InvalidPath(path.to_string()));
    }

    let endpoint = context.region.sqs_endpoint();
    let url = Url::parse(&format!("{}{}", endpoint.trim_end_matches('/'), path))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ErrorCause::InvalidEndpoint(format!(
            "unsupported scheme in {}",
            endpoint
        )));
    }
    if url.host_str().is_none() {
        return Err(ErrorCause::InvalidEndpoint(format!("no host in {}", endpoint)));
    }

    Ok(url)
}

/// Value of the `Host` header the transport will send
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Build and sign a request for `action` against `path`
///
/// `Action`, `Timestamp` and `Version` are added to `params` before signing.
pub fn build_request(
    context: &Context,
    method: Method,
    action: &str,
    path: &str,
    mut params: Params,
    timestamp: DateTime<Utc>,
) -> Result<SignedRequest, SqsError> {
    let mut url = target_url(context, path)?;

    params
        .set("Action", action)
        .set("Timestamp", timestamp.format(TIMESTAMP_FORMAT).to_string())
        .set("Version", API_VERSION);

    sqslite_auth::sign(
        &context.credentials,
        method.as_str(),
        &host_header(&url),
        url.path(),
        &mut params,
    );

    let encoded = params.to_form_string();
    let (headers, body) = match method {
        Method::Get => {
            url.set_query(Some(&encoded));
            (Vec::new(), None)
        }
        Method::Post => (
            vec![
                (
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ),
                ("Content-Length".to_string(), encoded.len().to_string()),
            ],
            Some(encoded),
        ),
    };

    Ok(SignedRequest {
        method,
        url,
        headers,
        body,
    })
}
