//! Webhook endpoint handler.
//!
//! Accepts GitHub webhook deliveries, validates signatures, decodes the
//! payload and publishes the resulting [`Event`](crate::webhooks::Event) to
//! the delivery channel before returning 202 Accepted.

use std::borrow::Cow;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::AppState;
use crate::delivery::PublishError;
use crate::types::DeliveryId;
use crate::webhooks::{ResolveError, SignatureError, VerifyError, decode_event_with_delivery, verify};

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature";

/// The only accepted media type.
const JSON_MEDIA_TYPE: &str = "application/json";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Content type is not JSON.
    #[error("unsupported content type: expected {JSON_MEDIA_TYPE}")]
    UnsupportedMediaType,

    /// Body is larger than the configured limit.
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Body could not be read (connection reset, malformed chunking, ...).
    #[error("failed to read request body: {0}")]
    BodyRead(axum::Error),

    /// The secret for this request could not be determined.
    #[error("secret resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Missing or invalid signature.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The HMAC could not be computed.
    #[error("signature verification failed: {0}")]
    Verify(String),

    /// The event could not be handed to the consumer.
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

impl From<VerifyError> for WebhookError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Signature(e) => WebhookError::Signature(e),
            VerifyError::Internal(msg) => WebhookError::Verify(msg),
        }
    }
}

impl WebhookError {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            WebhookError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            WebhookError::Signature(_) => StatusCode::FORBIDDEN,
            WebhookError::Publish(PublishError::Full | PublishError::TimedOut(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            WebhookError::BodyRead(_)
            | WebhookError::Resolve(_)
            | WebhookError::Verify(_)
            | WebhookError::Publish(PublishError::Closed) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, message).into_response()
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST (other methods get 405 from the router)
/// - Headers:
///   - `Content-Type: application/json`
///   - `X-GitHub-Event`: Event type (e.g., "pull_request", "push")
///   - `X-Hub-Signature`: HMAC-SHA1 signature of the body (`sha1=<hex>`)
///   - `X-GitHub-Delivery`: Unique delivery ID (optional)
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 202 Accepted: Event published
/// - 403 Forbidden: Missing or invalid signature
/// - 413 Payload Too Large: Body over the configured limit
/// - 415 Unsupported Media Type: Not JSON
/// - 500 Internal Server Error: Body read, secret lookup, HMAC or closed channel
/// - 503 Service Unavailable: Channel full (reject policy) or publish timed out
///
/// # Example
///
/// ```ignore
/// POST /webhook HTTP/1.1
/// X-GitHub-Event: push
/// X-GitHub-Delivery: 72d3162e-cc78-11e3-81ab-4c9367dc0958
/// X-Hub-Signature: sha1=...
/// Content-Type: application/json
///
/// {"ref": "refs/heads/main", ...}
///
/// HTTP/1.1 202 Accepted
///
/// ok
/// ```
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let (parts, body) = request.into_parts();
    let delivery_id = header_str(&parts.headers, HEADER_DELIVERY).map(DeliveryId::new);

    let result = receive(&app_state, parts, body, delivery_id.clone()).await;

    if let Err(e) = &result {
        let delivery_id = delivery_id.as_ref().map_or("-", DeliveryId::as_str);
        match e.status() {
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!(delivery_id, error = %e, "Webhook processing failed");
            }
            status => {
                warn!(delivery_id, status = status.as_u16(), error = %e, "Webhook rejected");
            }
        }
    }

    result.map(|()| (StatusCode::ACCEPTED, "ok"))
}

/// Runs one delivery through the pipeline, stopping at the first failure.
async fn receive(
    app_state: &AppState,
    parts: Parts,
    body: Body,
    delivery_id: Option<DeliveryId>,
) -> Result<(), WebhookError> {
    if !is_json(&parts.headers) {
        return Err(WebhookError::UnsupportedMediaType);
    }

    // The whole body is needed for the HMAC, so it is buffered once here and
    // only borrowed from then on.
    let limit = app_state.max_body_bytes();
    let body = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| body_error(e, limit))?;

    let secret = app_state.resolver().resolve(&parts).await?;

    // Verify signature BEFORE any parsing. Compared as raw bytes, so a value
    // that is not UTF-8 is invalid rather than missing.
    let signature = parts
        .headers
        .get(HEADER_SIGNATURE)
        .map(HeaderValue::as_bytes)
        .unwrap_or_default();
    verify(&secret, signature, &body)?;

    let event_type = header_lossy(&parts.headers, HEADER_EVENT);
    let event = decode_event_with_delivery(&event_type, delivery_id, &body);

    match &event.error {
        Some(e) => warn!(
            delivery_id = ?event.delivery_id,
            event_type = %event_type,
            error = %e,
            "Webhook payload did not decode; publishing with error"
        ),
        None if event.is_unrecognized() => {
            debug!(delivery_id = ?event.delivery_id, event_type = %event_type, "Unrecognized event type")
        }
        None => {}
    }

    let delivery_id = event.delivery_id.clone();
    app_state.publisher().publish(event).await?;

    info!(delivery_id = ?delivery_id, event_type = %event_type, "Webhook accepted");
    Ok(())
}

/// Extracts a header value as a string, if present and valid UTF-8.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extracts a header value as text, replacing bytes that are not UTF-8.
/// A missing header is the empty string.
fn header_lossy<'a>(headers: &'a HeaderMap, name: &str) -> Cow<'a, str> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
        .unwrap_or_default()
}

/// Returns true if the content type is `application/json`, ignoring
/// parameters such as `charset` and letter case.
fn is_json(headers: &HeaderMap) -> bool {
    header_str(headers, CONTENT_TYPE.as_str())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
}

/// Separates "body too large" from genuine read failures.
fn body_error(err: axum::Error, limit: usize) -> WebhookError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return WebhookError::PayloadTooLarge(limit);
        }
        source = e.source();
    }
    WebhookError::BodyRead(err)
}
