use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::progress::ProgressView;

/// Consider a cached view stale after 5 minutes.
/// Completions made elsewhere (another device, an admin) are picked up within that window.
const CACHE_STALE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() >= CACHE_STALE_MINUTES
    }
}

#[derive(Debug, Default)]
struct CacheState {
    views: HashMap<String, CachedData<ProgressView>>,
    /// Bumped on every invalidation; a view built from reads that began under
    /// an older generation is never stored.
    generations: HashMap<String, u64>,
}

#[derive(Debug, Default)]
pub struct ProgressViewCache {
    state: RwLock<CacheState>,
}

impl ProgressViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh cached view for an enrollment, if any
    pub async fn get(&self, enrollment_id: &str) -> Option<CachedData<ProgressView>> {
        let state = self.state.read().await;
        match state.views.get(enrollment_id) {
            Some(cached) if !cached.is_stale() => Some(cached.clone()),
            Some(cached) => {
                debug!(enrollment = enrollment_id, age = %cached.age_display(), "Cached view is stale");
                None
            }
            None => None,
        }
    }

    /// Current generation for an enrollment. Take it before reading from the
    /// store and hand it back to `put`.
    pub async fn generation(&self, enrollment_id: &str) -> u64 {
        let state = self.state.read().await;
        state.generations.get(enrollment_id).copied().unwrap_or(0)
    }

    /// Store a view built from reads started at `generation`.
    /// Returns false (and stores nothing) if the enrollment was invalidated since.
    pub async fn put(&self, view: ProgressView, generation: u64) -> bool {
        let mut state = self.state.write().await;
        let current = state.generations.get(&view.enrollment_id).copied().unwrap_or(0);
        if current != generation {
            debug!(
                enrollment = %view.enrollment_id,
                generation,
                current,
                "Discarding progress view built before invalidation"
            );
            return false;
        }
        state.views.insert(view.enrollment_id.clone(), CachedData::new(view));
        true
    }

    /// Drop the cached view for an enrollment and reject in-flight builds.
    /// Returns true if a view was cached.
    pub async fn invalidate(&self, enrollment_id: &str) -> bool {
        let mut state = self.state.write().await;
        *state.generations.entry(enrollment_id.to_string()).or_insert(0) += 1;
        let removed = state.views.remove(enrollment_id).is_some();
        if removed {
            debug!(enrollment = enrollment_id, "Invalidated cached progress view");
        }
        removed
    }
}

// ============================================================================
// Tests
// ============================================================================
