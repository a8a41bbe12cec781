//! HTTP server for the webhook receiver.
//!
//! This module implements the HTTP edge that:
//! - Accepts webhooks from GitHub, validates signatures, and publishes the
//!   decoded events to the delivery channel
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts GitHub webhook deliveries (returns 202 Accepted)
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::{WebhookError, webhook_handler};

use crate::delivery::EventPublisher;
use crate::webhooks::{Secret, SecretResolver, StaticResolver};

/// Default body limit: GitHub caps webhook payloads at 25 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor. Cloning is
/// cheap: the resolver is shared and the publisher is a channel handle.
#[derive(Clone)]
pub struct AppState {
    /// Picks the secret each delivery is verified with.
    resolver: Arc<dyn SecretResolver>,

    /// Sending half of the delivery channel.
    publisher: EventPublisher,

    /// Largest body the endpoint will buffer.
    max_body_bytes: usize,
}

impl AppState {
    /// Creates a new `AppState` verifying deliveries with `resolver` and
    /// publishing to `publisher`.
    pub fn new(resolver: impl SecretResolver + 'static, publisher: EventPublisher) -> Self {
        AppState {
            resolver: Arc::new(resolver),
            publisher,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Creates an `AppState` that checks every delivery against one secret.
    ///
    /// An empty secret disables verification.
    pub fn with_static_secret(secret: impl Into<Secret>, publisher: EventPublisher) -> Self {
        Self::new(StaticResolver::new(secret), publisher)
    }

    /// Sets the body size limit.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Returns the secret resolver.
    pub fn resolver(&self) -> &dyn SecretResolver {
        self.resolver.as_ref()
    }

    /// Returns the event publisher.
    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Returns the body size limit.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
