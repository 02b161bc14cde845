//! coursetrack core - course progress aggregation and lesson completion.
//!
//! The content store (a headless CMS) owns courses and enrollments. This
//! crate reads them through the `ContentStore` port, merges a course's
//! structure with an enrollment's completion record into an ordered
//! `ProgressView`, and records lesson completions with conditional writes.
//!
//! The main entry point is `CourseProgress`:
//!
//! ```no_run
//! use std::sync::Arc;
//! use coursetrack_core::{Config, ContentStoreClient, CourseProgress};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let store = Arc::new(ContentStoreClient::new(&config)?);
//! let progress = CourseProgress::new(store);
//! let view = progress.build_progress_view("42").await?;
//! println!("{}% complete", view.percent);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod completion;
pub mod config;
pub mod error;
pub mod models;
pub mod progress;
pub mod service;
pub mod store;

pub use api::ContentStoreClient;
pub use completion::{CompletionStatus, LessonCompletionService};
pub use config::Config;
pub use error::CoreError;
pub use progress::{ProgressStats, ProgressView};
pub use service::CourseProgress;
pub use store::{ContentStore, MemoryStore, StoreError};
