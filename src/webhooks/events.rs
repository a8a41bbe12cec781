//! GitHub webhook event types.
//!
//! An [`Event`] is what the endpoint hands to the application: the declared
//! event name plus, for the kinds we understand, a typed [`EventDetail`].
//!
//! # Event Types
//!
//! - `pull_request` - PR lifecycle (opened, closed, edited, synchronize, ...)
//! - `push` - commits pushed to a branch or tag
//!
//! Every other name (`ping`, `issues`, ...) is [`EventKind::Unrecognized`]: the
//! event is still delivered, with no detail and no error.
//!
//! The payload structs only name the fields we use. Anything else GitHub
//! sends is ignored, so new fields never break decoding.

use serde::{Deserialize, Serialize};

use crate::types::{DeliveryId, RepoId, Sha};

use super::decoder::DecodeError;

/// The supported event kinds, selected by the `X-GitHub-Event` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `pull_request`
    PullRequest,
    /// `push`
    Push,
    /// Any name without a typed shape.
    Unrecognized,
}

impl EventKind {
    /// Maps an `X-GitHub-Event` value to its kind.
    pub fn from_name(name: &str) -> Self {
        match name {
            "pull_request" => EventKind::PullRequest,
            "push" => EventKind::Push,
            _ => EventKind::Unrecognized,
        }
    }
}

/// A decoded webhook delivery.
///
/// Exactly one of these holds:
/// - `detail` is set (recognized name, body decoded),
/// - `error` is set (recognized name, body did not decode),
/// - neither is set (unrecognized name).
#[derive(Debug)]
pub struct Event {
    /// The event name from the `X-GitHub-Event` header.
    pub name: String,

    /// The `X-GitHub-Delivery` header, if the sender provided one.
    pub delivery_id: Option<DeliveryId>,

    /// The typed payload.
    pub detail: Option<EventDetail>,

    /// Why the payload could not be decoded.
    pub error: Option<DecodeError>,
}

impl Event {
    /// Returns the kind selected by this event's name.
    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.name)
    }

    /// Returns true if the event name has no typed shape.
    pub fn is_unrecognized(&self) -> bool {
        self.kind() == EventKind::Unrecognized
    }

    /// Login of the user who triggered the event.
    pub fn sender(&self) -> Option<&str> {
        self.detail.as_ref().map(|d| d.sender().login.as_str())
    }

    /// The repository the event belongs to.
    pub fn repo_id(&self) -> Option<RepoId> {
        self.detail.as_ref().map(|d| d.repository().repo_id())
    }
}

/// Typed payload of a recognized event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventDetail {
    PullRequest(PullRequestEvent),
    Push(PushEvent),
}

impl EventDetail {
    pub fn sender(&self) -> &User {
        match self {
            EventDetail::PullRequest(e) => &e.sender,
            EventDetail::Push(e) => &e.sender,
        }
    }

    pub fn repository(&self) -> &Repository {
        match self {
            EventDetail::PullRequest(e) => &e.repository,
            EventDetail::Push(e) => &e.repository,
        }
    }
}

/// A GitHub account (user, bot or organization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
}

/// The repository a delivery is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: User,

    #[serde(default)]
    pub private: bool,

    #[serde(default)]
    pub default_branch: Option<String>,
}

impl Repository {
    pub fn repo_id(&self) -> RepoId {
        RepoId::new(&self.owner.login, &self.name)
    }
}

// ============================================================================
// pull_request
// ============================================================================

/// Action performed on a pull request.
///
/// Actions GitHub adds later decode as [`PrAction::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrAction {
    Opened,
    Closed,
    Reopened,
    Edited,
    Synchronize,
    Assigned,
    Unassigned,
    Labeled,
    Unlabeled,
    ReviewRequested,
    ReviewRequestRemoved,
    ConvertedToDraft,
    ReadyForReview,
    #[serde(other)]
    Other,
}

/// Open/closed state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrState {
    Open,
    Closed,
}

/// A branch tip referenced by a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: Sha,
    #[serde(default)]
    pub label: Option<String>,
}

/// The pull request object embedded in a `pull_request` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub state: PrState,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub user: User,
    pub head: GitRef,
    pub base: GitRef,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub merged: Option<bool>,
    #[serde(default)]
    pub merge_commit_sha: Option<Sha>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// A `pull_request` delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub action: PrAction,
    pub number: u64,
    pub pull_request: PullRequest,
    pub repository: Repository,
    pub sender: User,
}

impl PullRequestEvent {
    /// Returns true if this event closed the PR by merging it.
    pub fn is_merge(&self) -> bool {
        self.action == PrAction::Closed && self.pull_request.merged.unwrap_or(false)
    }
}

// ============================================================================
// push
// ============================================================================

/// Author or committer of a pushed commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// One commit of a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: Sha,
    pub message: String,
    pub timestamp: String,
    pub author: CommitAuthor,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
}

/// The account whose credentials performed the push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pusher {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A `push` delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Full ref name, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub before: Sha,
    pub after: Sha,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub forced: bool,
    #[serde(default)]
    pub compare: Option<String>,
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub head_commit: Option<Commit>,
    pub pusher: Pusher,
    pub repository: Repository,
    pub sender: User,
}

impl PushEvent {
    /// Branch name if the push targeted a branch.
    pub fn branch(&self) -> Option<&str> {
        self.ref_name.strip_prefix("refs/heads/")
    }

    /// Tag name if the push targeted a tag.
    pub fn tag(&self) -> Option<&str> {
        self.ref_name.strip_prefix("refs/tags/")
    }
}
