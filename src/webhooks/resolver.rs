//! Secret resolution for incoming deliveries.
//!
//! The endpoint never holds a secret directly. It asks a [`SecretResolver`]
//! which secret applies to the request at hand, so a single-tenant deployment
//! and a multi-tenant one share the same handler and verifier.
//!
//! Resolvers only see the request head ([`Parts`]): the body is read exactly
//! once by the endpoint and must stay untouched for the HMAC.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;
use thiserror::Error;

use super::signature::Secret;

/// Header carrying the ID of the resource the hook is installed on.
pub const HEADER_HOOK_TARGET_ID: &str = "x-github-hook-installation-target-id";

/// Errors a resolver can report.
///
/// All of them are internal faults: none means "no secret".
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The request does not say which tenant it belongs to.
    #[error("missing header: {0}")]
    MissingTarget(&'static str),

    /// No secret is registered for the tenant.
    #[error("no secret registered for hook target {0}")]
    UnknownTarget(String),

    /// The backing store could not be queried.
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

/// Maps an inbound request to the secret its signature must be checked with.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, parts: &Parts) -> Result<Secret, ResolveError>;
}

#[async_trait]
impl<R: SecretResolver + ?Sized> SecretResolver for Arc<R> {
    async fn resolve(&self, parts: &Parts) -> Result<Secret, ResolveError> {
        (**self).resolve(parts).await
    }
}

/// Validates every request against one configured secret.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    secret: Secret,
}

impl StaticResolver {
    pub fn new(secret: impl Into<Secret>) -> Self {
        StaticResolver {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl SecretResolver for StaticResolver {
    async fn resolve(&self, _parts: &Parts) -> Result<Secret, ResolveError> {
        Ok(self.secret.clone())
    }
}

/// Picks a secret per hook target (repository, organization or app).
///
/// The target is read from the `X-GitHub-Hook-Installation-Target-ID` header.
/// Requests for unregistered targets use the fallback secret if one is set,
/// and fail otherwise.
#[derive(Debug, Clone, Default)]
pub struct TargetResolver {
    secrets: HashMap<String, Secret>,
    fallback: Option<Secret>,
}

impl TargetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the secret for one hook target.
    pub fn with_target(mut self, target_id: impl Into<String>, secret: impl Into<Secret>) -> Self {
        self.secrets.insert(target_id.into(), secret.into());
        self
    }

    /// Sets the secret used when the target is missing or unregistered.
    pub fn with_fallback(mut self, secret: impl Into<Secret>) -> Self {
        self.fallback = Some(secret.into());
        self
    }

    fn lookup(&self, parts: &Parts) -> Result<Secret, ResolveError> {
        let target = parts
            .headers
            .get(HEADER_HOOK_TARGET_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim);

        match (target, &self.fallback) {
            (Some(id), fallback) => self
                .secrets
                .get(id)
                .or(fallback.as_ref())
                .cloned()
                .ok_or_else(|| ResolveError::UnknownTarget(id.to_string())),
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(ResolveError::MissingTarget(HEADER_HOOK_TARGET_ID)),
        }
    }
}

#[async_trait]
impl SecretResolver for TargetResolver {
    async fn resolve(&self, parts: &Parts) -> Result<Secret, ResolveError> {
        self.lookup(parts)
    }
}
