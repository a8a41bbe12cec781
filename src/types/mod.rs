//! Identifier types shared by the event model.

pub mod ids;

pub use ids::{DeliveryId, InvalidSha, RepoId, Sha};
