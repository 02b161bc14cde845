//! REST client module for the headless content store.
//!
//! This module provides the `ContentStoreClient`, an HTTP implementation of
//! the `ContentStore` port. It reads enrollments, courses and lessons from
//! the store's item endpoints and replaces an enrollment's completion list
//! with a conditional update.
//!
//! Requests carry an optional static bearer token supplied through `Config`.

pub mod client;
pub mod error;

pub use client::ContentStoreClient;
pub use error::ApiError;
