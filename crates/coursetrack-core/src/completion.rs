//! Lesson completion.
//!
//! `LessonCompletionService::complete` records a lesson as completed for an
//! enrollment. It reads the enrollment, replaces the completion list with one
//! that includes the lesson, and makes the write conditional on the version it
//! read. A competing writer causes a conflict; the service then re-reads and
//! merges again, so concurrent completions of different lessons are all kept.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::store::{ContentStore, StoreError};

/// Maximum number of re-read/merge rounds after a version conflict.
const MAX_CONFLICT_RETRIES: u32 = 3;

/// Initial delay before re-reading after a conflict, doubled each round.
const INITIAL_CONFLICT_BACKOFF_MS: u64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionStatus {
    /// The lesson was already in the completion record; nothing was written.
    AlreadyCompleted,
    /// The lesson was added to the completion record.
    Completed,
}

impl CompletionStatus {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CompletionStatus::AlreadyCompleted => StatusCode::OK,
            CompletionStatus::Completed => StatusCode::CREATED,
        }
    }

    /// True if the completion record changed and derived views are stale
    pub fn changed_state(&self) -> bool {
        matches!(self, CompletionStatus::Completed)
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionStatus::AlreadyCompleted => write!(f, "Lesson already completed"),
            CompletionStatus::Completed => write!(f, "Lesson completed"),
        }
    }
}

#[derive(Clone)]
pub struct LessonCompletionService {
    store: Arc<dyn ContentStore>,
}

impl LessonCompletionService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Mark `lesson_id` completed for `enrollment_id`.
    ///
    /// Safe to retry: repeated calls converge on the same completion record.
    pub async fn complete(
        &self,
        enrollment_id: &str,
        lesson_id: &str,
    ) -> Result<CompletionStatus, CoreError> {
        let (mut enrollment, lesson) = futures::try_join!(
            self.store.get_enrollment(enrollment_id),
            self.store.get_lesson(lesson_id),
        )?;

        let mut conflicts = 0;
        let mut backoff_ms = INITIAL_CONFLICT_BACKOFF_MS;

        loop {
            if enrollment.completed_lessons.contains(&lesson.id) {
                debug!(enrollment = enrollment_id, lesson = %lesson.id, "Lesson already completed");
                return Ok(CompletionStatus::AlreadyCompleted);
            }

            let updated = enrollment.completed_lessons.with(&lesson.id);
            let result = self
                .store
                .update_enrollment_completions(&enrollment.id, updated.as_slice(), &enrollment.version)
                .await;

            match result {
                Ok(()) => {
                    info!(
                        enrollment = enrollment_id,
                        lesson = %lesson.id,
                        completed = updated.len(),
                        "Lesson completed"
                    );
                    return Ok(CompletionStatus::Completed);
                }
                Err(StoreError::Conflict) => {
                    conflicts += 1;
                    if conflicts > MAX_CONFLICT_RETRIES {
                        warn!(
                            enrollment = enrollment_id,
                            lesson = %lesson.id,
                            conflicts,
                            "Giving up after repeated version conflicts"
                        );
                        return Err(CoreError::Upstream(format!(
                            "Enrollment {} kept changing during update ({} conflicts)",
                            enrollment_id, conflicts
                        )));
                    }
                    warn!(
                        enrollment = enrollment_id,
                        retry = conflicts,
                        backoff_ms,
                        "Completion update conflicted, re-reading"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                    enrollment = self.store.get_enrollment(enrollment_id).await?;
                }
                Err(e) => {
                    warn!(enrollment = enrollment_id, lesson = %lesson.id, error = %e, "Completion update failed");
                    return Err(e.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Enrollment, RawCourse, RawLesson, RawModule};
    use crate::store::MemoryStore;

    fn setup(completed: &[&str]) -> (Arc<MemoryStore>, LessonCompletionService) {
        let store = Arc::new(MemoryStore::new());
        store.insert_course(
            RawCourse::new("c1", "Rust 101").with_module(
                RawModule::new("m1", "Basics", Some(1))
                    .with_lesson(RawLesson::new("L1", "Ownership", Some(1)))
                    .with_lesson(RawLesson::new("L2", "Borrowing", Some(2))),
            ),
        );
        store.insert_enrollment(Enrollment::new("e1", "c1").with_completed(completed.iter().copied()));
        let service = LessonCompletionService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn test_complete_new_lesson() {
        let (store, service) = setup(&["L1"]);
        let status = service.complete("e1", "L2").await.expect("complete");

        assert_eq!(status, CompletionStatus::Completed);
        assert_eq!(status.status_code().as_u16(), 201);
        assert!(status.changed_state());
        let enrollment = store.enrollment("e1").expect("enrollment");
        assert_eq!(enrollment.completed_lessons.as_slice(), &["L1", "L2"]);
    }

    #[tokio::test]
    async fn test_already_completed_performs_no_write() {
        let (store, service) = setup(&["L1", "L2"]);
        let status = service.complete("e1", "L1").await.expect("complete");

        assert_eq!(status, CompletionStatus::AlreadyCompleted);
        assert_eq!(status.status_code().as_u16(), 200);
        assert_eq!(store.write_count(), 0);
        assert_eq!(
            store.enrollment("e1").expect("enrollment").completed_lessons.as_slice(),
            &["L1", "L2"]
        );
    }

    #[tokio::test]
    async fn test_unknown_lesson_is_not_found_without_write() {
        let (store, service) = setup(&[]);
        let err = service.complete("e1", "L9").await.unwrap_err();

        assert!(matches!(err, CoreError::NotFound(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_enrollment_is_not_found() {
        let (store, service) = setup(&[]);
        let err = service.complete("e9", "L1").await.unwrap_err();

        assert_eq!(err.status_code().as_u16(), 404);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_conflict_is_retried() {
        let (store, service) = setup(&[]);
        store.force_conflicts(2);

        let status = service.complete("e1", "L1").await.expect("complete");
        assert_eq!(status, CompletionStatus::Completed);
        assert_eq!(store.write_count(), 3);
    }

    #[tokio::test]
    async fn test_conflicts_exhausted_is_upstream_failure() {
        let (store, service) = setup(&[]);
        store.force_conflicts(MAX_CONFLICT_RETRIES + 1);

        let err = service.complete("e1", "L1").await.unwrap_err();
        assert!(matches!(err, CoreError::Upstream(_)));
        assert_eq!(err.status_code().as_u16(), 500);
        assert!(store.enrollment("e1").expect("enrollment").completed_lessons.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_upstream_failure() {
        let (store, service) = setup(&[]);
        store.set_offline(true);

        let err = service.complete("e1", "L1").await.unwrap_err();
        assert_eq!(
            err,
            CoreError::Upstream("Network error: memory store is offline".to_string())
        );
    }
}
