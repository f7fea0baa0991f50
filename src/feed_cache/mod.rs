//! Client-side cache of paginated post feeds.
//!
//! Pages are keyed by [`FeedScope`] and page number, expire after a TTL, and
//! carry counters that can be patched optimistically ahead of the server.
//! The root component creates one [`SharedFeedCache`] per session and hands
//! it down through Leptos context.

mod cache;
mod clock;
mod optimistic;
mod scope;

use std::sync::{Arc, Mutex, PoisonError};

use leptos::prelude::*;

pub use cache::{CacheEntry, FeedCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use optimistic::OptimisticToken;
pub use scope::{FeedScope, ScopeKey};

use crate::models::PageNumber;

/// Cloneable handle to a [`FeedCache`].
///
/// The lock only exists because context values must be `Send + Sync`; it is
/// taken for the duration of one synchronous cache call and never held
/// across an `.await`.
#[derive(Clone, Debug)]
pub struct SharedFeedCache {
    inner: Arc<Mutex<FeedCache>>,
}

impl SharedFeedCache {
    pub fn new(cache: FeedCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FeedCache) -> R) -> R {
        let mut cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cache)
    }

    /// Owned copy of a live entry.
    pub fn read(&self, scope: &FeedScope, page: PageNumber) -> Option<CacheEntry> {
        self.with(|cache| cache.read(scope, page).cloned())
    }
}

pub fn provide_feed_cache(cache: SharedFeedCache) {
    provide_context(cache);
}

pub fn use_feed_cache() -> SharedFeedCache {
    expect_context::<SharedFeedCache>()
}
