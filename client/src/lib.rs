//! Client-side state and API access for the pinboard image-sharing app

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Pinboard REST API client
pub mod api;

/// Session and token handling
pub mod auth;

/// Object storage for uploaded images
pub mod media_storage;

/// Redirects requested by actions
pub mod navigation;

/// Transient request-status banner
pub mod status;

/// Session state container
pub mod store;

/// Configuration and error types
pub mod types;

pub use store::{Collaborators, PinboardStore, StoreConfig};
