//! Public operation surface for the presentation layer.
//!
//! `CourseProgress` validates identifiers, serves progress views (cached per
//! enrollment) and completes lessons, dropping the cached view whenever a
//! completion changes the record it was built from.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::ProgressViewCache;
use crate::completion::{CompletionStatus, LessonCompletionService};
use crate::error::CoreError;
use crate::progress::{build_progress_view, ProgressView};
use crate::store::ContentStore;

pub struct CourseProgress {
    store: Arc<dyn ContentStore>,
    completions: LessonCompletionService,
    cache: ProgressViewCache,
}

/// Characters allowed in an identifier: RFC 3986 unreserved, so an id is
/// always a single URL path segment as-is.
fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')
}

/// Trim an identifier and reject it if blank or not path-safe, before any store call.
fn require_id<'a>(value: &'a str, what: &str) -> Result<&'a str, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("Missing {} identifier", what)));
    }
    // "." and ".." would walk the path
    if !trimmed.chars().all(is_id_char) || trimmed.chars().all(|c| c == '.') {
        return Err(CoreError::Validation(format!("Malformed {} identifier: {:?}", what, value)));
    }
    Ok(trimmed)
}

impl CourseProgress {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            completions: LessonCompletionService::new(store.clone()),
            store,
            cache: ProgressViewCache::new(),
        }
    }

    pub fn cache(&self) -> &ProgressViewCache {
        &self.cache
    }

    /// Progress view for an enrollment, served from cache while fresh.
    pub async fn build_progress_view(&self, enrollment_id: &str) -> Result<ProgressView, CoreError> {
        let enrollment_id = require_id(enrollment_id, "enrollment")?;

        if let Some(cached) = self.cache.get(enrollment_id).await {
            debug!(enrollment = enrollment_id, age = %cached.age_display(), "Serving cached progress view");
            return Ok(cached.data);
        }

        self.refresh_progress_view(enrollment_id).await
    }

    /// Build a progress view from fresh reads, bypassing and refilling the cache.
    pub async fn refresh_progress_view(&self, enrollment_id: &str) -> Result<ProgressView, CoreError> {
        let enrollment_id = require_id(enrollment_id, "enrollment")?;

        let generation = self.cache.generation(enrollment_id).await;
        let enrollment = self.store.get_enrollment(enrollment_id).await?;
        let course_id = enrollment
            .course_id
            .as_deref()
            .ok_or_else(|| CoreError::NotFound(format!("Course for enrollment {}", enrollment_id)))?;
        let course = self.store.get_course(course_id).await?;

        let view = build_progress_view(&enrollment, course);
        self.cache.put(view.clone(), generation).await;
        Ok(view)
    }

    /// Mark a lesson completed. Safe to retry.
    pub async fn complete_lesson(
        &self,
        enrollment_id: &str,
        lesson_id: &str,
    ) -> Result<CompletionStatus, CoreError> {
        let enrollment_id = require_id(enrollment_id, "enrollment")?;
        let lesson_id = require_id(lesson_id, "lesson")?;

        let status = self.completions.complete(enrollment_id, lesson_id).await?;
        if status.changed_state() {
            self.cache.invalidate(enrollment_id).await;
        }
        info!(enrollment = enrollment_id, lesson = lesson_id, status = %status, "Completion request handled");
        Ok(status)
    }
}
