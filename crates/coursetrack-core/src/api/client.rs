//! HTTP client for the headless content store.
//!
//! Items are read from `{base}/items/<collection>/<id>` with an explicit
//! `fields` selection and arrive wrapped in a `{"data": ...}` envelope.
//! Completion updates use the store's update-by-query form so the write only
//! applies while `date_updated` still matches the version that was read.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::ApiError;
use crate::config::Config;
use crate::models::{Enrollment, Lesson, RawCourse, RawEnrollment, RawLesson, Version};
use crate::store::{ContentStore, StoreError};

// ============================================================================
// Constants
// ============================================================================

const ENROLLMENTS: &str = "enrollments";
const COURSES: &str = "courses";
const LESSONS: &str = "lessons";

/// Enrollment fields: summary, nested course and student, and the
/// completion junction with each lesson's module.
const ENROLLMENT_FIELDS: &str = "id,date_created,date_updated,percent_complete,is_completed,\
student.first_name,student.last_name,course.id,course.title,\
completed_lessons.lessons_id.id,completed_lessons.lessons_id.title,completed_lessons.lessons_id.sort,\
completed_lessons.lessons_id.module.id,completed_lessons.lessons_id.module.title,\
completed_lessons.lessons_id.module.sort";

const COURSE_FIELDS: &str = "id,title,modules.id,modules.title,modules.sort,\
modules.lessons.id,modules.lessons.title,modules.lessons.sort";

const LESSON_FIELDS: &str = "id,title,sort";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Serialize)]
struct CompletionRow<'a> {
    lessons_id: &'a str,
}

/// Content store client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ContentStoreClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ContentStoreClient {
    /// Create a client from explicit configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            token: config.token.clone(),
        })
    }

    fn item_url(&self, collection: &str, id: &str) -> String {
        format!("{}/items/{}/{}", self.base_url, collection, id)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/items/{}", self.base_url, collection)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid token header: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request built by `build`, retrying on 429 with exponential backoff.
    async fn send<T, F>(&self, url: &str, build: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> reqwest::RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build(&self.client)
                .headers(self.auth_headers()?)
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response.text().await?;
                    return serde_json::from_str(&text).map_err(|e| {
                        ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e))
                    });
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn get_item<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        fields: &str,
    ) -> Result<T, ApiError> {
        let url = self.item_url(collection, id);
        debug!(url = %url, "Fetching item");
        let envelope: DataEnvelope<Option<T>> = self
            .send(&url, |client| client.get(&url).query(&[("fields", fields)]))
            .await?;
        // Some store versions answer a missing item with 200 and `data: null`.
        envelope
            .data
            .ok_or_else(|| ApiError::NotFound(format!("{} {}", collection, id)))
    }

    /// Build the update-by-query body that replaces the completion junction
    /// only while `date_updated` still equals `expected`.
    fn completion_update_body(enrollment_id: &str, lesson_ids: &[String], expected: &Version) -> Value {
        let version_filter = if expected.is_initial() {
            json!({ "date_updated": { "_null": true } })
        } else {
            json!({ "date_updated": { "_eq": expected.as_str() } })
        };

        let rows: Vec<CompletionRow<'_>> = lesson_ids
            .iter()
            .map(|id| CompletionRow { lessons_id: id })
            .collect();

        json!({
            "query": {
                "filter": {
                    "_and": [
                        { "id": { "_eq": enrollment_id } },
                        version_filter
                    ]
                },
                "limit": 1
            },
            "data": { "completed_lessons": rows }
        })
    }
}

/// Map a not-found body to a readable subject; the store's own body is noise.
fn not_found_as(subject: String) -> impl FnOnce(ApiError) -> StoreError {
    move |err| match err {
        ApiError::NotFound(_) => StoreError::NotFound(subject),
        other => other.into(),
    }
}

#[async_trait]
impl ContentStore for ContentStoreClient {
    async fn get_enrollment(&self, id: &str) -> Result<Enrollment, StoreError> {
        let raw: RawEnrollment = self
            .get_item(ENROLLMENTS, id, ENROLLMENT_FIELDS)
            .await
            .map_err(not_found_as(format!("Enrollment {}", id)))?;
        Ok(Enrollment::from(raw))
    }

    async fn get_course(&self, id: &str) -> Result<RawCourse, StoreError> {
        self.get_item(COURSES, id, COURSE_FIELDS)
            .await
            .map_err(not_found_as(format!("Course {}", id)))
    }

    async fn get_lesson(&self, id: &str) -> Result<Lesson, StoreError> {
        let raw: RawLesson = self
            .get_item(LESSONS, id, LESSON_FIELDS)
            .await
            .map_err(not_found_as(format!("Lesson {}", id)))?;
        Ok(Lesson::from(raw))
    }

    async fn update_enrollment_completions(
        &self,
        enrollment_id: &str,
        lesson_ids: &[String],
        expected: &Version,
    ) -> Result<(), StoreError> {
        let url = self.collection_url(ENROLLMENTS);
        let body = Self::completion_update_body(enrollment_id, lesson_ids, expected);
        debug!(enrollment = enrollment_id, count = lesson_ids.len(), version = %expected, "Replacing completion list");

        let updated: DataEnvelope<Vec<Value>> = self
            .send(&url, |client| client.patch(&url).json(&body))
            .await
            .map_err(not_found_as(format!("Enrollment {}", enrollment_id)))?;

        // Zero matched rows: the version moved on (or the enrollment vanished;
        // the caller's re-read tells the two apart).
        if updated.data.is_empty() {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ContentStoreClient {
        let config = Config {
            base_url: Some("https://cms.example/".into()),
            token: Some("secret".into()),
            request_timeout_secs: Some(5),
        };
        ContentStoreClient::new(&config).expect("Failed to build client")
    }

    #[test]
    fn test_urls() {
        let client = client();
        assert_eq!(client.item_url(ENROLLMENTS, "e1"), "https://cms.example/items/enrollments/e1");
        assert_eq!(client.collection_url(ENROLLMENTS), "https://cms.example/items/enrollments");
    }

    #[test]
    fn test_auth_headers() {
        let headers = client().auth_headers().expect("headers");
        assert_eq!(
            headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Bearer secret")
        );

        let anonymous = ContentStoreClient::new(&Config {
            base_url: Some("http://localhost:8055".into()),
            ..Config::default()
        })
        .expect("Failed to build client");
        assert!(anonymous.auth_headers().expect("headers").is_empty());
    }

    #[test]
    fn test_new_requires_base_url() {
        assert!(ContentStoreClient::new(&Config::default()).is_err());
    }

    #[test]
    fn test_completion_update_body_with_version() {
        let ids = vec!["L1".to_string(), "L2".to_string()];
        let body = ContentStoreClient::completion_update_body(
            "e1",
            &ids,
            &Version::new("2024-03-02T10:30:00.000Z"),
        );

        assert_eq!(body["query"]["filter"]["_and"][0]["id"]["_eq"], "e1");
        assert_eq!(
            body["query"]["filter"]["_and"][1]["date_updated"]["_eq"],
            "2024-03-02T10:30:00.000Z"
        );
        assert_eq!(
            body["data"]["completed_lessons"],
            json!([{"lessons_id": "L1"}, {"lessons_id": "L2"}])
        );
    }

    #[test]
    fn test_completion_update_body_initial_version() {
        let body = ContentStoreClient::completion_update_body("e1", &[], &Version::default());
        assert_eq!(body["query"]["filter"]["_and"][1]["date_updated"]["_null"], true);
        assert_eq!(body["data"]["completed_lessons"], json!([]));
    }

    #[test]
    fn test_parse_envelopes() {
        let json = r#"{"data": {"id": "c1", "title": "Rust 101", "modules": [{"id": 1, "sort": null, "lessons": null}]}}"#;
        let envelope: DataEnvelope<Option<RawCourse>> =
            serde_json::from_str(json).expect("Failed to parse course envelope");
        let course = envelope.data.expect("course present");
        assert_eq!(course.modules.as_ref().map(Vec::len), Some(1));

        let json = r#"{"data": null}"#;
        let envelope: DataEnvelope<Option<RawCourse>> =
            serde_json::from_str(json).expect("Failed to parse null envelope");
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_not_found_as_rewrites_subject() {
        let err = not_found_as("Lesson L1".into())(ApiError::NotFound("{\"errors\":[]}".into()));
        assert_eq!(err, StoreError::NotFound("Lesson L1".into()));

        let err = not_found_as("Lesson L1".into())(ApiError::RateLimited);
        assert_eq!(err, StoreError::RateLimited);
    }
}
