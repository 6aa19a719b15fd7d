//! HTTP handlers for the query API

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::Response,
};
use bytes::Bytes;
use sqslite_core::{Credentials, Params, API_VERSION};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{escape_xml, ErrorCode, ServiceError};
use crate::storage::{QueueSettings, SqsStorage};
use crate::ACCOUNT_ID;

const XMLNS: &str = "http://queue.amazonaws.com/doc/2009-02-01/";

/// Attributes returned for `AttributeName.n=All`, in this order
const QUEUE_ATTRIBUTES: &[&str] = &[
    "ApproximateNumberOfMessages",
    "ApproximateNumberOfMessagesNotVisible",
    "VisibilityTimeout",
    "CreatedTimestamp",
    "LastModifiedTimestamp",
    "Policy",
    "MaximumMessageSize",
    "MessageRetentionPeriod",
    "QueueArn",
];

const MESSAGE_ATTRIBUTES: &[&str] = &[
    "SenderId",
    "SentTimestamp",
    "ApproximateReceiveCount",
    "ApproximateFirstReceiveTimestamp",
];

/// State shared by the handlers
#[derive(Debug)]
pub struct ServerState {
    pub storage: SqsStorage,
    /// The only key pair the server accepts
    pub credentials: Credentials,
}

/// Handle a query API request addressed by its `Action` parameter
pub async fn handle_request(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let params = if method == Method::POST {
        Params::from_form(&body)
    } else {
        Params::from_form(uri.query().unwrap_or_default().as_bytes())
    };
    let action = params.get("Action").unwrap_or_default();

    info!(action = %action, method = %method, path = %uri.path(), "SQS request");

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let result = authenticate(&state.credentials, method.as_str(), host, uri.path(), &params)
        .and_then(|()| dispatch(&state, action, uri.path(), &params));

    match result {
        Ok(result) => xml_response(StatusCode::OK, render(action, result, &request_id)),
        Err(e) => {
            warn!(action = %action, code = e.code.as_str(), message = %e.message, "SQS error");
            let status =
                StatusCode::from_u16(e.code.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
            xml_response(status, e.to_xml(&request_id))
        }
    }
}

/// Check the key, the signature and the protocol parameters
fn authenticate(
    credentials: &Credentials,
    method: &str,
    host: &str,
    path: &str,
    params: &Params,
) -> Result<(), ServiceError> {
    if params.get("AWSAccessKeyId") != Some(credentials.access_key.as_str()) {
        return Err(ServiceError::new(
            ErrorCode::InvalidClientTokenId,
            "The security token included in the request is invalid.",
        ));
    }

    sqslite_auth::verify_signature(&credentials.secret_key, method, host, path, params)
        .map_err(|e| ServiceError::new(ErrorCode::SignatureDoesNotMatch, e.to_string()))?;

    match params.get("Version") {
        Some(API_VERSION) => {}
        Some(other) => {
            return Err(ServiceError::new(
                ErrorCode::NoSuchVersion,
                format!("Version {} is not supported", other),
            ))
        }
        None => return Err(missing("Version")),
    }

    let timestamp = required(params, "Timestamp")?;
    if chrono::DateTime::parse_from_rfc3339(timestamp).is_err() {
        return Err(invalid("Timestamp", timestamp));
    }
    Ok(())
}

fn dispatch(
    state: &ServerState,
    action: &str,
    path: &str,
    params: &Params,
) -> Result<Option<String>, ServiceError> {
    match action {
        "" => Err(missing("Action")),
        "ListQueues" => list_queues(state, params),
        "CreateQueue" => create_queue(state, params),
        _ => {
            let queue = queue_name(path)?;
            match action {
                "DeleteQueue" => delete_queue(state, queue),
                "GetQueueAttributes" => get_queue_attributes(state, queue, params),
                "SetQueueAttributes" => set_queue_attributes(state, queue, params),
                "SendMessage" => send_message(state, queue, params),
                "ReceiveMessage" => receive_message(state, queue, params),
                "DeleteMessage" => delete_message(state, queue, params),
                "ChangeMessageVisibility" => change_message_visibility(state, queue, params),
                "AddPermission" => add_permission(state, queue, params),
                "RemovePermission" => remove_permission(state, queue, params),
                other => Err(ServiceError::new(
                    ErrorCode::InvalidAction,
                    format!("The action {} is not valid for this endpoint.", other),
                )),
            }
        }
    }
}

// === Parameter helpers ===

fn missing(key: &str) -> ServiceError {
    ServiceError::new(
        ErrorCode::MissingParameter,
        format!("The request must contain the parameter {}.", key),
    )
}

fn invalid(key: &str, value: &str) -> ServiceError {
    ServiceError::new(
        ErrorCode::InvalidParameterValue,
        format!("Value {} for parameter {} is invalid.", value, key),
    )
}

fn required<'a>(params: &'a Params, key: &str) -> Result<&'a str, ServiceError> {
    params.get(key).ok_or_else(|| missing(key))
}

fn optional_u32(params: &Params, key: &str) -> Result<Option<u32>, ServiceError> {
    params
        .get(key)
        .map(|v| v.parse::<u32>().map_err(|_| invalid(key, v)))
        .transpose()
}

/// `/{account}/{queue}` -> queue
fn queue_name(path: &str) -> Result<&str, ServiceError> {
    match path.trim_matches('/').split('/').collect::<Vec<_>>()[..] {
        [ACCOUNT_ID, name] if !name.is_empty() => Ok(name),
        _ => Err(ServiceError::new(
            ErrorCode::NonExistentQueue,
            "The specified queue does not exist for this wsdl version.",
        )),
    }
}

fn attribute_xml(name: &str, value: &str) -> String {
    format!(
        "<Attribute><Name>{}</Name><Value>{}</Value></Attribute>",
        name,
        escape_xml(value)
    )
}

// === Actions ===

fn list_queues(state: &ServerState, params: &Params) -> Result<Option<String>, ServiceError> {
    let urls = state.storage.list_queues(params.get("QueueNamePrefix"));
    let xml: String = urls
        .iter()
        .map(|url| format!("<QueueUrl>{}</QueueUrl>", escape_xml(url)))
        .collect();
    Ok(Some(xml))
}

fn create_queue(state: &ServerState, params: &Params) -> Result<Option<String>, ServiceError> {
    let name = required(params, "QueueName")?;
    let settings = QueueSettings {
        visibility_timeout: optional_u32(params, "DefaultVisibilityTimeout")?,
        maximum_message_size: optional_u32(params, "MaximumMessageSize")?,
    };

    let queue = state.storage.create_queue(name, &settings)?;
    Ok(Some(format!("<QueueUrl>{}</QueueUrl>", escape_xml(&queue.url))))
}

fn delete_queue(state: &ServerState, queue: &str) -> Result<Option<String>, ServiceError> {
    state.storage.delete_queue(queue)?;
    Ok(None)
}

fn get_queue_attributes(
    state: &ServerState,
    queue_name: &str,
    params: &Params,
) -> Result<Option<String>, ServiceError> {
    let queue = state.storage.get_queue(queue_name)?;
    let requested = params.get_indexed("AttributeName");

    let names: Vec<&str> = if requested.contains(&"All") {
        QUEUE_ATTRIBUTES.to_vec()
    } else {
        if let Some(unknown) = requested.iter().find(|n| !QUEUE_ATTRIBUTES.contains(*n)) {
            return Err(ServiceError::new(
                ErrorCode::InvalidAttributeName,
                format!("Unknown Attribute {}.", unknown),
            ));
        }
        requested
    };

    let (visible, in_flight) = state.storage.message_counts(queue_name)?;
    let mut xml = String::new();
    for name in names {
        let value = match name {
            "ApproximateNumberOfMessages" => Some(visible.to_string()),
            "ApproximateNumberOfMessagesNotVisible" => Some(in_flight.to_string()),
            "VisibilityTimeout" => Some(queue.visibility_timeout.to_string()),
            "CreatedTimestamp" => Some(queue.created_timestamp.to_string()),
            "LastModifiedTimestamp" => Some(queue.last_modified_timestamp.to_string()),
            "Policy" => queue.policy(),
            "MaximumMessageSize" => Some(queue.maximum_message_size.to_string()),
            "MessageRetentionPeriod" => Some(queue.message_retention_period.to_string()),
            "QueueArn" => Some(queue.arn.clone()),
            _ => None,
        };
        if let Some(value) = value {
            xml.push_str(&attribute_xml(name, &value));
        }
    }
    Ok(Some(xml))
}

fn set_queue_attributes(
    state: &ServerState,
    queue: &str,
    params: &Params,
) -> Result<Option<String>, ServiceError> {
    let name = required(params, "Attribute.Name")?;
    let value = required(params, "Attribute.Value")?;

    state.storage.set_attribute(queue, name, value)?;
    Ok(None)
}

fn send_message(
    state: &ServerState,
    queue: &str,
    params: &Params,
) -> Result<Option<String>, ServiceError> {
    let body = required(params, "MessageBody")?;
    let message = state.storage.send_message(queue, body.to_string())?;

    Ok(Some(format!(
        "<MD5OfMessageBody>{}</MD5OfMessageBody><MessageId>{}</MessageId>",
        message.md5_of_body, message.message_id
    )))
}

fn receive_message(
    state: &ServerState,
    queue: &str,
    params: &Params,
) -> Result<Option<String>, ServiceError> {
    let max_messages = optional_u32(params, "MaxNumberOfMessages")?.unwrap_or(1);
    let visibility_timeout = optional_u32(params, "VisibilityTimeout")?;
    let requested = params.get_indexed("AttributeName");
    let wanted = |name: &str| requested.contains(&"All") || requested.contains(&name);

    let messages = state
        .storage
        .receive_message(queue, max_messages, visibility_timeout)?;

    let mut xml = String::new();
    for msg in messages {
        xml.push_str("<Message>");
        xml.push_str(&format!("<MessageId>{}</MessageId>", msg.message_id));
        xml.push_str(&format!(
            "<ReceiptHandle>{}</ReceiptHandle>",
            msg.receipt_handle.as_deref().unwrap_or_default()
        ));
        xml.push_str(&format!("<MD5OfBody>{}</MD5OfBody>", msg.md5_of_body));
        xml.push_str(&format!("<Body>{}</Body>", escape_xml(&msg.body)));
        for name in MESSAGE_ATTRIBUTES.iter().copied().filter(|n| wanted(*n)) {
            let value = match name {
                "SenderId" => ACCOUNT_ID.to_string(),
                "SentTimestamp" => msg.sent_timestamp.to_string(),
                "ApproximateReceiveCount" => msg.approximate_receive_count.to_string(),
                _ => msg
                    .approximate_first_receive_timestamp
                    .unwrap_or_default()
                    .to_string(),
            };
            xml.push_str(&attribute_xml(name, &value));
        }
        xml.push_str("</Message>");
    }
    Ok(Some(xml))
}

fn delete_message(
    state: &ServerState,
    queue: &str,
    params: &Params,
) -> Result<Option<String>, ServiceError> {
    let receipt_handle = required(params, "ReceiptHandle")?;
    state.storage.delete_message(queue, receipt_handle)?;
    Ok(None)
}

fn change_message_visibility(
    state: &ServerState,
    queue: &str,
    params: &Params,
) -> Result<Option<String>, ServiceError> {
    let receipt_handle = required(params, "ReceiptHandle")?;
    let timeout =
        optional_u32(params, "VisibilityTimeout")?.ok_or_else(|| missing("VisibilityTimeout"))?;

    state
        .storage
        .change_message_visibility(queue, receipt_handle, timeout)?;
    Ok(None)
}

fn add_permission(
    state: &ServerState,
    queue: &str,
    params: &Params,
) -> Result<Option<String>, ServiceError> {
    let label = required(params, "Label")?;
    let accounts = params.get_indexed("AWSAccountId");
    let actions = params.get_indexed("ActionName");
    if accounts.len() != actions.len() {
        return Err(invalid("ActionName", &actions.join(",")));
    }

    let grants = accounts
        .into_iter()
        .zip(actions)
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
    state.storage.add_permission(queue, label, grants)?;
    Ok(None)
}

fn remove_permission(
    state: &ServerState,
    queue: &str,
    params: &Params,
) -> Result<Option<String>, ServiceError> {
    let label = required(params, "Label")?;
    state.storage.remove_permission(queue, label)?;
    Ok(None)
}

// === XML Helpers ===

/// Wrap an action result in its `<XResponse>` envelope
fn render(action: &str, result: Option<String>, request_id: &str) -> String {
    let result = result
        .map(|inner| format!("<{a}Result>{inner}</{a}Result>", a = action, inner = inner))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0"?>
<{a}Response xmlns="{ns}">{result}<ResponseMetadata><RequestId>{id}</RequestId></ResponseMetadata></{a}Response>"#,
        a = action,
        ns = XMLNS,
        result = result,
        id = request_id
    )
}

fn xml_response(status: StatusCode, body: String) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/xml"),
    );
    response
}
