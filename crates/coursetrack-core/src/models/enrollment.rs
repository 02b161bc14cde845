use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id_string;

// ============================================================================
// Store records
// ============================================================================

/// Enrollment record as returned by the content store.
///
/// Relations (`course`, the completion junction) may come back either as bare
/// keys or as expanded objects depending on the requested fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEnrollment {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_updated: Option<String>,
    #[serde(default)]
    pub percent_complete: Option<f64>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub student: Option<RawStudent>,
    #[serde(default)]
    pub course: Option<RawRelation>,
    #[serde(default)]
    pub completed_lessons: Option<Vec<RawCompletion>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStudent {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// A many-to-one relation: a bare key or an expanded `{id, title}` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRelation {
    Text(String),
    Number(i64),
    Expanded {
        #[serde(deserialize_with = "id_string")]
        id: String,
        #[serde(default)]
        title: Option<String>,
    },
}

impl RawRelation {
    pub fn id(&self) -> String {
        match self {
            RawRelation::Text(id) => id.clone(),
            RawRelation::Number(id) => id.to_string(),
            RawRelation::Expanded { id, .. } => id.clone(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            RawRelation::Expanded { title, .. } => title.as_deref(),
            _ => None,
        }
    }
}

/// One row of the enrollment ↔ lesson junction.
///
/// `lessons_id` is `null` when the lesson was deleted from the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCompletion {
    #[serde(default)]
    pub lessons_id: Option<RawRelation>,
}

// ============================================================================
// Normalized enrollment
// ============================================================================

/// Opaque revision marker of an enrollment, used for conditional writes.
/// Empty for records that have never been updated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the record has no recorded update yet
    pub fn is_initial(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "<initial>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Lesson ids an enrollment has completed, deduplicated, first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletedSet {
    ids: Vec<String>,
}

impl CompletedSet {
    pub fn contains(&self, lesson_id: &str) -> bool {
        self.ids.iter().any(|id| id == lesson_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    /// Copy of the set with `lesson_id` added (no-op if already present)
    pub fn with(&self, lesson_id: &str) -> Self {
        let mut next = self.clone();
        if !next.contains(lesson_id) {
            next.ids.push(lesson_id.to_string());
        }
        next
    }
}

impl FromIterator<String> for CompletedSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let ids = iter
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Self { ids }
    }
}

impl<'a> FromIterator<&'a str> for CompletedSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub first_name: String,
    pub last_name: String,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub course_id: Option<String>,
    pub course_title: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_updated: Option<DateTime<Utc>>,
    pub percent_complete: f64,
    pub is_completed: bool,
    pub student: Student,
    pub completed_lessons: CompletedSet,
    pub version: Version,
}

impl Enrollment {
    pub fn new(id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            course_id: Some(course_id.into()),
            course_title: None,
            date_created: None,
            date_updated: None,
            percent_complete: 0.0,
            is_completed: false,
            student: Student::default(),
            completed_lessons: CompletedSet::default(),
            version: Version::default(),
        }
    }

    pub fn with_student(mut self, first_name: &str, last_name: &str) -> Self {
        self.student = Student {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        self
    }

    pub fn with_completed<'a>(mut self, lesson_ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.completed_lessons = lesson_ids.into_iter().collect();
        self
    }
}

/// Parse a store timestamp. Accepts RFC 3339 and zone-less values (read as UTC).
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl From<RawEnrollment> for Enrollment {
    fn from(raw: RawEnrollment) -> Self {
        let completed_lessons: CompletedSet = raw
            .completed_lessons
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| row.lessons_id.map(|lesson| lesson.id()))
            .collect();

        let date_updated = raw.date_updated.as_deref().and_then(parse_timestamp);
        if raw.date_updated.is_some() && date_updated.is_none() {
            debug!(enrollment = %raw.id, value = ?raw.date_updated, "Unparseable date_updated");
        }

        let student = raw.student.unwrap_or_default();

        Self {
            course_id: raw.course.as_ref().map(RawRelation::id),
            course_title: raw.course.as_ref().and_then(|c| c.title()).map(str::to_string),
            date_created: raw.date_created.as_deref().and_then(parse_timestamp),
            date_updated,
            percent_complete: raw.percent_complete.unwrap_or(0.0),
            is_completed: raw.is_completed.unwrap_or(false),
            student: Student {
                first_name: student.first_name.unwrap_or_default(),
                last_name: student.last_name.unwrap_or_default(),
            },
            completed_lessons,
            // The raw string is kept verbatim so the store can compare it exactly.
            version: Version::new(raw.date_updated.unwrap_or_default()),
            id: raw.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_set_dedups_preserving_first_occurrence() {
        let set: CompletedSet = ["L2", "L1", "L2", "L3", "L1"].into_iter().collect();
        assert_eq!(set.as_slice(), &["L2", "L1", "L3"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_completed_set_with_is_idempotent() {
        let set: CompletedSet = ["L1"].into_iter().collect();
        let once = set.with("L2");
        let twice = once.with("L2");
        assert_eq!(once, twice);
        assert_eq!(twice.as_slice(), &["L1", "L2"]);
        // original untouched
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_parse_enrollment_expanded() {
        let json = r#"{
            "id": 12,
            "date_created": "2024-03-01T09:00:00.000Z",
            "date_updated": "2024-03-02T10:30:00.000Z",
            "percent_complete": 50,
            "is_completed": false,
            "student": {"first_name": "Ada", "last_name": "Lovelace"},
            "course": {"id": "c1", "title": "Rust 101"},
            "completed_lessons": [
                {"lessons_id": {"id": "L1", "title": "Ownership", "sort": 1, "module": {"id": "m1", "title": "Basics", "sort": 1}}},
                {"lessons_id": {"id": "L1", "title": "Ownership", "sort": 1}},
                {"lessons_id": null}
            ]
        }"#;

        let raw: RawEnrollment = serde_json::from_str(json).expect("Failed to parse enrollment JSON");
        let enrollment = Enrollment::from(raw);

        assert_eq!(enrollment.id, "12");
        assert_eq!(enrollment.course_id.as_deref(), Some("c1"));
        assert_eq!(enrollment.course_title.as_deref(), Some("Rust 101"));
        assert_eq!(enrollment.student.full_name(), "Ada Lovelace");
        assert_eq!(enrollment.completed_lessons.as_slice(), &["L1"]);
        assert_eq!(enrollment.percent_complete, 50.0);
        assert_eq!(enrollment.version.as_str(), "2024-03-02T10:30:00.000Z");
        assert!(enrollment.date_updated.is_some());
    }

    #[test]
    fn test_parse_enrollment_bare_keys() {
        let json = r#"{"id": "e1", "course": 4, "completed_lessons": [{"lessons_id": 9}, {"lessons_id": "L2"}]}"#;
        let enrollment = Enrollment::from(
            serde_json::from_str::<RawEnrollment>(json).expect("Failed to parse enrollment JSON"),
        );

        assert_eq!(enrollment.course_id.as_deref(), Some("4"));
        assert_eq!(enrollment.course_title, None);
        assert_eq!(enrollment.completed_lessons.as_slice(), &["9", "L2"]);
        assert!(enrollment.version.is_initial());
        assert!(!enrollment.is_completed);
    }

    #[test]
    fn test_parse_timestamp_without_zone() {
        let parsed = parse_timestamp("2024-03-02T10:30:00").expect("zone-less timestamp");
        assert_eq!(parsed.to_rfc3339(), "2024-03-02T10:30:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }
}
