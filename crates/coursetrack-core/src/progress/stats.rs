use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::Course;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
}

impl ProgressStats {
    /// Whole-number completion percentage, rounded down. 0 for an empty course.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let percent = self.completed.min(self.total) * 100 / self.total;
        percent as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.remaining == 0
    }
}

/// Derive progress counts for a course given the number of resolved completions.
///
/// `remaining` never goes negative: a completed count above the lesson total is
/// a data-integrity problem, logged and clamped rather than raised.
pub fn calculate_stats(course: &Course, completed: usize) -> ProgressStats {
    let total = course.lesson_count();
    if completed > total {
        warn!(
            course = %course.id,
            completed,
            total,
            "Completed lesson count exceeds course total"
        );
    }

    ProgressStats {
        total,
        completed,
        remaining: total.saturating_sub(completed),
    }
}
