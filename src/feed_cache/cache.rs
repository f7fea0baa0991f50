use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::optimistic::PendingPatch;
use super::scope::{FeedScope, ScopeKey};
use crate::config::FeedConfig;
use crate::models::{CounterDelta, Counters, PageNumber, Post, PostId};

/// One cached page of a feed. For appended pages `posts` holds every post
/// from page 1 up to and including `page`.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub(super) posts: Vec<Post>,
    pub(super) fetched_at: DateTime<Utc>,
    pub(super) has_more: bool,
    pub(super) page: PageNumber,
    pub(super) first_page: PageNumber,
    pub(super) generation: u64,
}

impl CacheEntry {
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn page(&self) -> PageNumber {
        self.page
    }

    /// Earliest page whose posts this entry holds. Page 1 unless an append
    /// found no live predecessor.
    pub fn first_page(&self) -> PageNumber {
        self.first_page
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }

    pub(super) fn contains(&self, post_id: &PostId) -> bool {
        self.posts.iter().any(|p| &p.id == post_id)
    }
}

/// In-memory, TTL-gated cache of paginated post lists keyed by `(scope, page)`.
///
/// Every operation is synchronous and infallible. Owned by whoever creates it;
/// share it through [`super::SharedFeedCache`].
#[derive(Debug)]
pub struct FeedCache {
    pub(super) entries: HashMap<ScopeKey, CacheEntry>,
    pub(super) pending: HashMap<u64, PendingPatch>,
    pub(super) next_token: u64,
    clock: Box<dyn Clock>,
    ttl: Duration,
    next_generation: u64,
}

impl FeedCache {
    pub fn new(clock: impl Clock + 'static, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            pending: HashMap::new(),
            next_token: 0,
            clock: Box::new(clock),
            ttl,
            next_generation: 0,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(SystemClock, config.cache_ttl())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry only while it is younger than the TTL.
    pub fn read(&self, scope: &FeedScope, page: PageNumber) -> Option<&CacheEntry> {
        let key = ScopeKey::new(scope.clone(), page);
        let now = self.clock.now();
        self.entries
            .get(&key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
    }

    /// Stores a fetched page. With `append`, the posts are concatenated onto the
    /// live entry for the previous page of the same scope; without one the
    /// write is a plain create.
    pub fn write(
        &mut self,
        scope: FeedScope,
        page: PageNumber,
        posts: Vec<Post>,
        has_more: bool,
        append: bool,
    ) -> &CacheEntry {
        let mut combined = Vec::new();
        let mut first_page = page;
        let mut copied_from = None;
        if append {
            match page.prev().and_then(|prev| self.read(&scope, prev).map(|e| (prev, e))) {
                Some((prev, previous)) => {
                    combined.extend_from_slice(previous.posts());
                    first_page = previous.first_page;
                    copied_from = Some((ScopeKey::new(scope.clone(), prev), previous.generation));
                }
                None if page.is_first() => {}
                None => warn!(
                    "appending page {} of {} without a cached page {}, storing it on its own",
                    page,
                    scope,
                    page.get() - 1
                ),
            }
        }
        combined.extend(posts);

        self.next_generation += 1;
        let generation = self.next_generation;
        let key = ScopeKey::new(scope, page);
        debug!("caching {} posts under {}", combined.len(), key);

        let entry = CacheEntry {
            posts: combined,
            fetched_at: self.clock.now(),
            has_more,
            page,
            first_page,
            generation,
        };
        self.entries.insert(key.clone(), entry);
        // the copied prefix still carries unresolved optimistic changes
        if let Some((from, from_generation)) = copied_from {
            self.carry_pending(&from, from_generation, &key, generation);
        }
        &self.entries[&key]
    }

    /// Drops every page of `scope`. With `None` only the global feed is
    /// dropped; author feeds are left alone.
    pub fn invalidate(&mut self, scope: Option<&FeedScope>) -> usize {
        let target = scope.unwrap_or(&FeedScope::Global);
        let before = self.entries.len();
        self.entries.retain(|key, _| &key.scope != target);
        let removed = before - self.entries.len();
        info!("invalidated {} cached pages for {}", removed, target);
        removed
    }

    /// Drops every entry and every unresolved optimistic update.
    pub fn clear(&mut self) {
        info!(
            "clearing feed cache ({} pages, {} pending updates)",
            self.entries.len(),
            self.pending.len()
        );
        self.entries.clear();
        self.pending.clear();
    }

    /// Drops entries past their TTL. Reads already ignore them.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, ttl));
        before - self.entries.len()
    }

    /// Counters of the first live cached copy of a post.
    pub fn counters_of(&self, post_id: &PostId) -> Option<Counters> {
        let now = self.clock.now();
        self.entries
            .values()
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .flat_map(|entry| entry.posts.iter())
            .find(|p| &p.id == post_id)
            .map(|p| p.counters)
    }

    /// Adds `delta` to every cached copy of the post, clamping at zero.
    /// Each call counts as one event; repeating it repeats the effect.
    pub fn patch_counters(&mut self, post_id: &PostId, delta: CounterDelta) -> usize {
        let mut patched = 0;
        for entry in self.entries.values_mut() {
            for post in entry.posts.iter_mut().filter(|p| &p.id == post_id) {
                post.counters = post.counters.apply(delta);
                patched += 1;
            }
        }
        debug!("patched {} cached copies of post {} by {:?}", patched, post_id, delta);
        patched
    }

    /// Puts a freshly created post at the top of page 1 of `scope` and of the
    /// global feed. Later pages are not touched.
    pub fn add_post(&mut self, post: Post, scope: &FeedScope) -> usize {
        let mut targets = vec![ScopeKey::new(scope.clone(), PageNumber::FIRST)];
        if !scope.is_global() {
            targets.push(ScopeKey::new(FeedScope::Global, PageNumber::FIRST));
        }

        let mut inserted = 0;
        for key in targets {
            if let Some(entry) = self.entries.get_mut(&key) {
                if entry.contains(&post.id) {
                    continue;
                }
                entry.posts.insert(0, post.clone());
                inserted += 1;
            }
        }
        debug!("added post {} to {} cached pages", post.id, inserted);
        inserted
    }
}
