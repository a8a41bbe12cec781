//! Webhook handling for GitHub events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA1)
//! - Secret resolution per request (static or per hook target)
//! - Event decoding into typed [`Event`] values

pub mod decoder;
pub mod events;
pub mod resolver;
pub mod signature;

pub use decoder::{DecodeError, decode_event, decode_event_with_delivery};
pub use events::{
    Commit, CommitAuthor, Event, EventDetail, EventKind, GitRef, PrAction, PrState, PullRequest,
    PullRequestEvent, PushEvent, Pusher, Repository, User,
};
pub use resolver::{HEADER_HOOK_TARGET_ID, ResolveError, SecretResolver, StaticResolver, TargetResolver};
pub use signature::{
    Secret, SignatureError, VerifyError, compute_signature, format_signature_header, verify,
};
