//! In-process content store.
//!
//! Holds courses and enrollments in memory and enforces the same conditional
//! update contract as the remote store, using a per-enrollment revision
//! counter as the version. Used for offline fixtures and as a test double.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use super::{ContentStore, StoreError};
use crate::models::{Enrollment, Lesson, RawCourse, RawEnrollment, Version};

/// Fixture file layout: store records in the same shape the remote store returns.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub courses: Vec<RawCourse>,
    #[serde(default)]
    pub enrollments: Vec<RawEnrollment>,
}

#[derive(Debug)]
struct StoredEnrollment {
    enrollment: Enrollment,
    revision: u64,
}

impl StoredEnrollment {
    fn version(&self) -> Version {
        Version::new(self.revision.to_string())
    }

    fn snapshot(&self) -> Enrollment {
        let mut enrollment = self.enrollment.clone();
        enrollment.version = self.version();
        enrollment
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    courses: HashMap<String, RawCourse>,
    enrollments: HashMap<String, StoredEnrollment>,
    offline: bool,
    forced_conflicts: u32,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let store = Self::new();
        for course in fixture.courses {
            store.insert_course(course);
        }
        for enrollment in fixture.enrollments {
            store.insert_enrollment(Enrollment::from(enrollment));
        }
        store
    }

    /// Load a fixture from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let fixture: Fixture = serde_json::from_str(json)?;
        Ok(Self::from_fixture(fixture))
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // Nothing in this module can panic while holding the lock.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_course(&self, course: RawCourse) {
        self.lock().courses.insert(course.id.clone(), course);
    }

    pub fn insert_enrollment(&self, enrollment: Enrollment) {
        self.lock().enrollments.insert(
            enrollment.id.clone(),
            StoredEnrollment {
                enrollment,
                revision: 1,
            },
        );
    }

    /// Current state of an enrollment, bypassing call accounting
    pub fn enrollment(&self, id: &str) -> Option<Enrollment> {
        self.lock().enrollments.get(id).map(StoredEnrollment::snapshot)
    }

    /// Make every call fail with a network error while `offline` is set
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Simulate `count` competing writers: each of the next `count` updates
    /// finds the enrollment already moved to a newer revision.
    pub fn force_conflicts(&self, count: u32) {
        self.lock().forced_conflicts = count;
    }

    /// Number of read calls served (successful or not)
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of update calls received (successful or not)
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_online(state: &MemoryState) -> Result<(), StoreError> {
        if state.offline {
            Err(StoreError::Network("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_enrollment(&self, id: &str) -> Result<Enrollment, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        Self::check_online(&state)?;
        state
            .enrollments
            .get(id)
            .map(StoredEnrollment::snapshot)
            .ok_or_else(|| StoreError::NotFound(format!("Enrollment {}", id)))
    }

    async fn get_course(&self, id: &str) -> Result<RawCourse, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        Self::check_online(&state)?;
        state
            .courses
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Course {}", id)))
    }

    async fn get_lesson(&self, id: &str) -> Result<Lesson, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        Self::check_online(&state)?;
        state
            .courses
            .values()
            .find_map(|course| course.find_lesson(id))
            .map(|(_, lesson)| Lesson::from(lesson.clone()))
            .ok_or_else(|| StoreError::NotFound(format!("Lesson {}", id)))
    }

    async fn update_enrollment_completions(
        &self,
        enrollment_id: &str,
        lesson_ids: &[String],
        expected: &Version,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        Self::check_online(&state)?;

        let forced = state.forced_conflicts > 0;
        if forced {
            state.forced_conflicts -= 1;
        }

        let stored = state
            .enrollments
            .get_mut(enrollment_id)
            .ok_or_else(|| StoreError::NotFound(format!("Enrollment {}", enrollment_id)))?;

        if forced {
            stored.revision += 1;
        }

        if stored.version() != *expected {
            debug!(
                enrollment = enrollment_id,
                expected = %expected,
                current = stored.revision,
                "Rejecting stale completion update"
            );
            return Err(StoreError::Conflict);
        }

        stored.enrollment.completed_lessons = lesson_ids.iter().cloned().collect();
        stored.enrollment.date_updated = Some(Utc::now());
        stored.revision += 1;
        Ok(())
    }
}
