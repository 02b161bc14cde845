//! Progress aggregation.
//!
//! A pure, synchronous pass over snapshots already fetched from the store:
//!
//! 1. `tree::build_course_tree` orders the raw course canonically
//! 2. `merge::merge_completions` annotates lessons with completion state
//! 3. `stats::calculate_stats` derives total/completed/remaining counts
//!
//! `view::build_progress_view` runs all three for one enrollment. Nothing in
//! here performs I/O or returns an error; malformed input degrades to empty
//! sequences and zero counts.

pub mod merge;
pub mod stats;
pub mod tree;
pub mod view;

pub use merge::{merge_completions, CompletedLesson, LessonProgress, MergedCourse, ModuleProgress};
pub use stats::{calculate_stats, ProgressStats};
pub use tree::build_course_tree;
pub use view::{build_progress_view, ProgressView};
