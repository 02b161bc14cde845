//! Content store port.
//!
//! The content store is the system of record for courses and enrollments.
//! The core only depends on the `ContentStore` trait; `ContentStoreClient`
//! (HTTP) and `MemoryStore` (in-process) implement it.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Enrollment, Lesson, RawCourse, Version};

/// Errors surfaced by content store implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// The record changed since it was read; the write was not applied.
    #[error("Version conflict")]
    Conflict,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Read and conditional-write access to enrollments, courses and lessons.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch an enrollment, including its course reference and completion list.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the enrollment does not exist.
    async fn get_enrollment(&self, id: &str) -> Result<Enrollment, StoreError>;

    /// Fetch a course with its nested modules and lessons.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the course does not exist.
    async fn get_course(&self, id: &str) -> Result<RawCourse, StoreError>;

    /// Fetch a single lesson.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the lesson does not exist.
    async fn get_lesson(&self, id: &str) -> Result<Lesson, StoreError>;

    /// Replace the enrollment's completion list with exactly `lesson_ids`,
    /// provided the enrollment is still at `expected`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the enrollment changed since `expected`
    /// was read, or other store errors.
    async fn update_enrollment_completions(
        &self,
        enrollment_id: &str,
        lesson_ids: &[String],
        expected: &Version,
    ) -> Result<(), StoreError>;
}
