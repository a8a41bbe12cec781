//! GitHub webhook payload decoder.
//!
//! Turns a verified body into an [`Event`]. Decoding never fails as a
//! function: a bad body for a recognized event type is recorded on the event
//! and left to the consumer.
//!
//! # Decoding Strategy
//!
//! 1. The event type comes from the `X-GitHub-Event` header
//! 2. The name selects one of the typed shapes in [`super::events`]
//! 3. Unknown event types produce an event with no detail and no error
//! 4. The body is parsed once, fully; on failure `detail` stays empty

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::DeliveryId;

use super::events::{Event, EventDetail, EventKind, PullRequestEvent, PushEvent};

/// Why a recognized payload could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// JSON deserialization failed (syntax, missing field or wrong type).
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decodes a webhook payload into an [`Event`].
///
/// # Examples
///
/// ```
/// use hub_hooks::webhooks::decode_event;
///
/// let event = decode_event("ping", br#"{"zen": "Design for failure."}"#);
/// assert_eq!(event.name, "ping");
/// assert!(event.detail.is_none());
/// assert!(event.error.is_none());
///
/// let event = decode_event("push", b"not json");
/// assert!(event.detail.is_none());
/// assert!(event.error.is_some());
/// ```
pub fn decode_event(name: &str, body: &[u8]) -> Event {
    let detail = match EventKind::from_name(name) {
        EventKind::PullRequest => decode::<PullRequestEvent>(body).map(EventDetail::PullRequest),
        EventKind::Push => decode::<PushEvent>(body).map(EventDetail::Push),
        EventKind::Unrecognized => {
            return Event {
                name: name.to_string(),
                delivery_id: None,
                detail: None,
                error: None,
            };
        }
    };

    let (detail, error) = match detail {
        Ok(detail) => (Some(detail), None),
        Err(e) => (None, Some(e)),
    };

    Event {
        name: name.to_string(),
        delivery_id: None,
        detail,
        error,
    }
}

/// Like [`decode_event`], also recording the delivery ID.
pub fn decode_event_with_delivery(
    name: &str,
    delivery_id: Option<DeliveryId>,
    body: &[u8],
) -> Event {
    Event {
        delivery_id,
        ..decode_event(name, body)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(body)?)
}
