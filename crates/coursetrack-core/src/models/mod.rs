//! Data models for course and enrollment entities.
//!
//! This module contains the data structures used on both sides of the
//! content store boundary:
//!
//! - `RawCourse`, `RawModule`, `RawLesson`: course records as delivered by
//!   the store, with every optional field defaulted at deserialization
//! - `Course`, `Module`, `Lesson`: the canonical, ordered course tree
//! - `RawEnrollment`, `Enrollment`: a student's enrollment and completion record
//! - `CompletedSet`: the deduplicated set of completed lesson ids

pub mod course;
pub mod enrollment;

pub use course::{Course, Lesson, Module, RawCourse, RawLesson, RawModule};
pub use enrollment::{CompletedSet, Enrollment, RawEnrollment, Student, Version};

use serde::{Deserialize, Deserializer};

/// Content store ids arrive as strings (uuid primary keys) or integers
/// (auto-increment keys). Both are carried as strings.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or integer id, got {}",
            other
        ))),
    }
}
