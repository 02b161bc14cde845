use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{build_course_tree, calculate_stats, merge_completions};
use super::{CompletedLesson, ModuleProgress, ProgressStats};
use crate::models::{Enrollment, RawCourse, Student};

/// Ordered, completion-annotated course for one enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub enrollment_id: String,
    pub course_id: String,
    pub course_title: String,
    pub student: Student,
    pub modules: Vec<ModuleProgress>,
    pub completed_lessons: Vec<CompletedLesson>,
    pub stats: ProgressStats,
    pub percent: u8,
}

impl ProgressView {
    /// The first lesson in course order not yet completed
    pub fn next_lesson(&self) -> Option<(&ModuleProgress, &str)> {
        self.modules.iter().find_map(|module| {
            module
                .lessons
                .iter()
                .find(|lesson| !lesson.completed)
                .map(|lesson| (module, lesson.id.as_str()))
        })
    }
}

/// Run the full aggregation pass for one enrollment.
pub fn build_progress_view(enrollment: &Enrollment, course: RawCourse) -> ProgressView {
    let course = build_course_tree(course);
    let merged = merge_completions(&course, &enrollment.completed_lessons);
    let stats = calculate_stats(&course, merged.completed.len());

    debug!(
        enrollment = %enrollment.id,
        course = %course.id,
        total = stats.total,
        completed = stats.completed,
        dropped = merged.dropped.len(),
        "Built progress view"
    );

    let course_title = if course.title.is_empty() {
        enrollment.course_title.clone().unwrap_or_default()
    } else {
        course.title
    };

    ProgressView {
        enrollment_id: enrollment.id.clone(),
        course_id: course.id,
        course_title,
        student: enrollment.student.clone(),
        modules: merged.modules,
        completed_lessons: merged.completed,
        percent: stats.percent(),
        stats,
    }
}
