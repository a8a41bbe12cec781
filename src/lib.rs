//! Hub Hooks - receives GitHub webhooks, verifies their signatures and hands
//! typed events to the application through an in-process channel.
//!
//! The pieces, leaf first:
//! - [`webhooks`]: signature verification, secret resolution, event decoding
//! - [`delivery`]: the channel between the HTTP edge and the consumer
//! - [`server`]: the axum endpoint tying them together
//! - [`config`]: environment configuration for the bundled binary

pub mod config;
pub mod delivery;
pub mod server;
pub mod types;
pub mod webhooks;
