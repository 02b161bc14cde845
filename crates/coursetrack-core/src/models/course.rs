use serde::{Deserialize, Serialize};

use super::id_string;

// ============================================================================
// Store records
// ============================================================================

/// Course record as returned by the content store.
///
/// `modules` may be missing or `null`; both read as `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCourse {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub modules: Option<Vec<RawModule>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawModule {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sort: Option<i64>,
    #[serde(default)]
    pub lessons: Option<Vec<RawLesson>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLesson {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sort: Option<i64>,
}

impl RawCourse {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            modules: Some(Vec::new()),
        }
    }

    pub fn with_module(mut self, module: RawModule) -> Self {
        self.modules.get_or_insert_with(Vec::new).push(module);
        self
    }

    /// Find a lesson anywhere in the course by id
    pub fn find_lesson(&self, lesson_id: &str) -> Option<(&RawModule, &RawLesson)> {
        self.modules.iter().flatten().find_map(|module| {
            module
                .lessons
                .iter()
                .flatten()
                .find(|lesson| lesson.id == lesson_id)
                .map(|lesson| (module, lesson))
        })
    }
}

impl RawModule {
    pub fn new(id: impl Into<String>, title: impl Into<String>, sort: Option<i64>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            sort,
            lessons: Some(Vec::new()),
        }
    }

    pub fn with_lesson(mut self, lesson: RawLesson) -> Self {
        self.lessons.get_or_insert_with(Vec::new).push(lesson);
        self
    }
}

impl RawLesson {
    pub fn new(id: impl Into<String>, title: impl Into<String>, sort: Option<i64>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            sort,
        }
    }
}

// ============================================================================
// Canonical tree
// ============================================================================

/// Canonically ordered course: modules and lessons sorted by `(sort, arrival)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub sort: i64,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub sort: i64,
}

impl Course {
    /// Number of lessons across all modules
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}

impl From<RawLesson> for Lesson {
    fn from(raw: RawLesson) -> Self {
        Self {
            id: raw.id,
            title: raw.title.unwrap_or_default(),
            sort: raw.sort.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_course_with_null_modules() {
        let json = r#"{"id": 7, "title": "Rust 101", "modules": null}"#;
        let course: RawCourse = serde_json::from_str(json).expect("Failed to parse course JSON");
        assert_eq!(course.id, "7");
        assert!(course.modules.is_none());
    }

    #[test]
    fn test_parse_module_missing_sort_and_lessons() {
        let json = r#"{"id": "c1", "modules": [{"id": "m1", "title": "Intro"}]}"#;
        let course: RawCourse = serde_json::from_str(json).expect("Failed to parse course JSON");
        let modules = course.modules.expect("modules present");
        assert_eq!(modules[0].sort, None);
        assert!(modules[0].lessons.is_none());
        assert_eq!(course.title, None);
    }

    #[test]
    fn test_parse_lesson_null_sort() {
        let json = r#"{"id": "L1", "title": "Ownership", "sort": null}"#;
        let lesson: RawLesson = serde_json::from_str(json).expect("Failed to parse lesson JSON");
        assert_eq!(lesson.sort, None);

        let lesson = Lesson::from(lesson);
        assert_eq!(lesson.sort, 0);
        assert_eq!(lesson.title, "Ownership");
    }

    #[test]
    fn test_reject_object_id() {
        let json = r#"{"id": {"nested": true}}"#;
        assert!(serde_json::from_str::<RawLesson>(json).is_err());
    }

    #[test]
    fn test_find_lesson() {
        let course = RawCourse::new("c1", "Course")
            .with_module(RawModule::new("m1", "One", Some(1)).with_lesson(RawLesson::new("L1", "a", None)))
            .with_module(RawModule::new("m2", "Two", Some(2)).with_lesson(RawLesson::new("L2", "b", None)));

        let (module, lesson) = course.find_lesson("L2").expect("lesson present");
        assert_eq!(module.id, "m2");
        assert_eq!(lesson.id, "L2");
        assert!(course.find_lesson("L9").is_none());
    }
}
