use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CompletedSet, Course, Lesson, Module};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub id: String,
    pub title: String,
    pub sort: i64,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    pub id: String,
    pub title: String,
    pub sort: i64,
    pub lessons: Vec<LessonProgress>,
}

impl ModuleProgress {
    pub fn completed_count(&self) -> usize {
        self.lessons.iter().filter(|l| l.completed).count()
    }

    /// A module with no lessons is never complete
    pub fn is_complete(&self) -> bool {
        !self.lessons.is_empty() && self.lessons.iter().all(|l| l.completed)
    }
}

/// A completed lesson resolved against the course tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedLesson {
    pub lesson_id: String,
    pub lesson_title: String,
    pub lesson_sort: i64,
    pub module_id: String,
    pub module_title: String,
    pub module_sort: i64,
}

impl CompletedLesson {
    fn new(module: &Module, lesson: &Lesson) -> Self {
        Self {
            lesson_id: lesson.id.clone(),
            lesson_title: lesson.title.clone(),
            lesson_sort: lesson.sort,
            module_id: module.id.clone(),
            module_title: module.title.clone(),
            module_sort: module.sort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergedCourse {
    /// Modules in canonical order with per-lesson completion flags
    pub modules: Vec<ModuleProgress>,
    /// Completed lessons in canonical course order
    pub completed: Vec<CompletedLesson>,
    /// Completed ids that no longer exist in the course
    pub dropped: Vec<String>,
}

/// Combine a canonical course with an enrollment's completion record.
///
/// The completed list follows course order (module, then lesson), not the
/// order lessons were completed. Ids that do not resolve to a lesson in the
/// course are left out of the list and reported in `dropped`.
pub fn merge_completions(course: &Course, completed_ids: &CompletedSet) -> MergedCourse {
    // A lesson id listed under two modules resolves to its first position.
    let mut positions: HashMap<&str, (usize, usize)> = HashMap::new();
    for (module_idx, module) in course.modules.iter().enumerate() {
        for (lesson_idx, lesson) in module.lessons.iter().enumerate() {
            positions
                .entry(lesson.id.as_str())
                .or_insert((module_idx, lesson_idx));
        }
    }

    let mut resolved = Vec::with_capacity(completed_ids.len());
    let mut dropped = Vec::new();
    for id in completed_ids.iter() {
        match positions.get(id) {
            Some(&position) => resolved.push(position),
            None => dropped.push(id.to_string()),
        }
    }
    resolved.sort_unstable();

    if !dropped.is_empty() {
        debug!(
            course = %course.id,
            dropped = ?dropped,
            "Completed lessons not present in course"
        );
    }

    let completed = resolved
        .into_iter()
        .map(|(module_idx, lesson_idx)| {
            let module = &course.modules[module_idx];
            CompletedLesson::new(module, &module.lessons[lesson_idx])
        })
        .collect();

    let completed_lookup: HashSet<&str> = completed_ids.iter().collect();
    let modules = course
        .modules
        .iter()
        .map(|module| ModuleProgress {
            id: module.id.clone(),
            title: module.title.clone(),
            sort: module.sort,
            lessons: module
                .lessons
                .iter()
                .map(|lesson| LessonProgress {
                    id: lesson.id.clone(),
                    title: lesson.title.clone(),
                    sort: lesson.sort,
                    completed: completed_lookup.contains(lesson.id.as_str()),
                })
                .collect(),
        })
        .collect();

    MergedCourse {
        modules,
        completed,
        dropped,
    }
}
