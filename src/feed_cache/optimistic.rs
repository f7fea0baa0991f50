//! Two-phase optimistic counter updates.
//!
//! [`FeedCache::begin_optimistic`] applies an assumed delta right away and
//! remembers exactly what it changed in each cached page. The returned token
//! is then resolved once, either with [`FeedCache::commit`] and the delta the
//! server actually reported, or with [`FeedCache::rollback`].
//!
//! Pages rewritten from the server after `begin` already carry authoritative
//! counters, so resolution skips them. Pages appended after `begin` copy
//! their predecessor's posts, optimistic changes included, so they join the
//! update and are resolved along with it.

use log::{debug, warn};

use super::cache::FeedCache;
use super::scope::ScopeKey;
use crate::models::{CounterDelta, PostId};

/// Handle to an unresolved optimistic update.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "optimistic updates must be committed or rolled back"]
pub struct OptimisticToken {
    id: u64,
    post_id: PostId,
}

impl OptimisticToken {
    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PendingPatch {
    post_id: PostId,
    applied: Vec<AppliedPatch>,
}

#[derive(Debug, Clone)]
struct AppliedPatch {
    key: ScopeKey,
    generation: u64,
    // post-clamp change, so undoing it is exact
    effective: CounterDelta,
}

impl FeedCache {
    pub fn begin_optimistic(&mut self, post_id: &PostId, assumed: CounterDelta) -> OptimisticToken {
        let mut applied = Vec::new();
        for (key, entry) in self.entries.iter_mut() {
            let mut effective = None;
            for post in entry.posts.iter_mut().filter(|p| &p.id == post_id) {
                let before = post.counters;
                post.counters = before.apply(assumed);
                effective.get_or_insert(post.counters.delta_since(before));
            }
            if let Some(effective) = effective {
                applied.push(AppliedPatch {
                    key: key.clone(),
                    generation: entry.generation,
                    effective,
                });
            }
        }

        self.next_token += 1;
        let id = self.next_token;
        debug!(
            "optimistic update {} on post {}: {:?} across {} pages",
            id,
            post_id,
            assumed,
            applied.len()
        );
        self.pending.insert(
            id,
            PendingPatch {
                post_id: post_id.clone(),
                applied,
            },
        );

        OptimisticToken {
            id,
            post_id: post_id.clone(),
        }
    }

    /// Replaces the assumed change with `actual`. Returns `false` if the
    /// update was already discarded by [`FeedCache::clear`].
    pub fn commit(&mut self, token: OptimisticToken, actual: CounterDelta) -> bool {
        match self.pending.remove(&token.id) {
            Some(pending) => {
                debug!("committing optimistic update {} with {:?}", token.id, actual);
                self.resolve(&pending, Some(actual));
                true
            }
            None => false,
        }
    }

    /// Undoes the assumed change. Returns `false` if the update was already
    /// discarded by [`FeedCache::clear`].
    pub fn rollback(&mut self, token: OptimisticToken) -> bool {
        match self.pending.remove(&token.id) {
            Some(pending) => {
                warn!("rolling back optimistic update {} on post {}", token.id, pending.post_id);
                self.resolve(&pending, None);
                true
            }
            None => false,
        }
    }

    pub fn pending_optimistic(&self) -> usize {
        self.pending.len()
    }

    /// Records `to` in every open update that changed `from` at
    /// `from_generation`, after `to` was built from a copy of `from`.
    pub(super) fn carry_pending(
        &mut self,
        from: &ScopeKey,
        from_generation: u64,
        to: &ScopeKey,
        to_generation: u64,
    ) {
        for (id, pending) in self.pending.iter_mut() {
            let carried = pending
                .applied
                .iter()
                .find(|patch| &patch.key == from && patch.generation == from_generation)
                .map(|patch| patch.effective);
            if let Some(effective) = carried {
                debug!("optimistic update {} now also covers {}", id, to);
                pending.applied.push(AppliedPatch {
                    key: to.clone(),
                    generation: to_generation,
                    effective,
                });
            }
        }
    }

    fn resolve(&mut self, pending: &PendingPatch, actual: Option<CounterDelta>) {
        for patch in &pending.applied {
            let Some(entry) = self.entries.get_mut(&patch.key) else {
                continue;
            };
            if entry.generation != patch.generation {
                debug!("{} was refetched since the optimistic update, leaving it", patch.key);
                continue;
            }
            for post in entry.posts.iter_mut().filter(|p| p.id == pending.post_id) {
                let mut counters = post.counters.apply(-patch.effective);
                if let Some(actual) = actual {
                    counters = counters.apply(actual);
                }
                post.counters = counters;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::feed_cache::{FeedCache, FeedScope, ManualClock};
    use crate::models::{Author, CounterDelta, Counters, PageNumber, Post, PostId};

    fn post(id: &str, counters: Counters) -> Post {
        let author = Author {
            id: "u1".to_string(),
            username: "alice".to_string(),
            first_name: None,
            last_name: None,
        };
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Post::new(PostId::new(id).unwrap(), author, "hi", created).with_counters(counters)
    }

    fn seeded(counters: Counters) -> FeedCache {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let mut cache = FeedCache::new(clock, Duration::minutes(5));
        let p = post("p1", counters);
        cache.write(FeedScope::author("alice"), PageNumber::FIRST, vec![p.clone()], false, false);
        cache.write(FeedScope::Global, PageNumber::FIRST, vec![p], false, false);
        cache
    }

    fn counters_in(cache: &FeedCache, scope: &FeedScope) -> Counters {
        cache.read(scope, PageNumber::FIRST).unwrap().posts()[0].counters
    }

    #[test]
    fn begin_applies_everywhere() {
        let mut cache = seeded(Counters::new(3, 1));
        let id = PostId::new("p1").unwrap();
        let token = cache.begin_optimistic(&id, CounterDelta::likes(1));

        assert_eq!(counters_in(&cache, &FeedScope::Global), Counters::new(4, 1));
        assert_eq!(counters_in(&cache, &FeedScope::author("alice")), Counters::new(4, 1));
        assert_eq!(cache.pending_optimistic(), 1);
        assert_eq!(token.post_id(), &id);
        assert!(cache.rollback(token));
    }

    #[test]
    fn rollback_restores_original_counters() {
        let mut cache = seeded(Counters::new(3, 1));
        let id = PostId::new("p1").unwrap();
        let token = cache.begin_optimistic(&id, CounterDelta::likes(1));
        assert!(cache.rollback(token));

        assert_eq!(counters_in(&cache, &FeedScope::Global), Counters::new(3, 1));
        assert_eq!(counters_in(&cache, &FeedScope::author("alice")), Counters::new(3, 1));
        assert_eq!(cache.pending_optimistic(), 0);
    }

    #[test]
    fn rollback_after_clamp_is_exact() {
        let mut cache = seeded(Counters::new(0, 0));
        let id = PostId::new("p1").unwrap();
        let token = cache.begin_optimistic(&id, CounterDelta::likes(-1));
        assert_eq!(counters_in(&cache, &FeedScope::Global), Counters::new(0, 0));

        cache.rollback(token);
        assert_eq!(counters_in(&cache, &FeedScope::Global), Counters::new(0, 0));
    }

    #[test]
    fn commit_reconciles_to_server_outcome() {
        let mut cache = seeded(Counters::new(3, 1));
        let id = PostId::new("p1").unwrap();
        // assumed a like, server says the post was already liked
        let token = cache.begin_optimistic(&id, CounterDelta::likes(1));
        assert!(cache.commit(token, CounterDelta::ZERO));
        assert_eq!(counters_in(&cache, &FeedScope::Global), Counters::new(3, 1));

        let token = cache.begin_optimistic(&id, CounterDelta::likes(1));
        cache.commit(token, CounterDelta::likes(1));
        assert_eq!(counters_in(&cache, &FeedScope::author("alice")), Counters::new(4, 1));
    }

    #[test]
    fn refetched_pages_are_left_alone() {
        let mut cache = seeded(Counters::new(3, 1));
        let id = PostId::new("p1").unwrap();
        let token = cache.begin_optimistic(&id, CounterDelta::likes(1));

        cache.write(
            FeedScope::Global,
            PageNumber::FIRST,
            vec![post("p1", Counters::new(10, 1))],
            false,
            false,
        );
        cache.rollback(token);

        assert_eq!(counters_in(&cache, &FeedScope::Global), Counters::new(10, 1));
        assert_eq!(counters_in(&cache, &FeedScope::author("alice")), Counters::new(3, 1));
    }

    fn page_two(cache: &FeedCache) -> Counters {
        let entry = cache.read(&FeedScope::Global, PageNumber::new(2).unwrap()).unwrap();
        entry.posts()[0].counters
    }

    #[test]
    fn rollback_reaches_pages_appended_after_begin() {
        let mut cache = seeded(Counters::new(5, 0));
        let id = PostId::new("p1").unwrap();
        let token = cache.begin_optimistic(&id, CounterDelta::likes(1));

        let page2 = PageNumber::new(2).unwrap();
        cache.write(FeedScope::Global, page2, vec![post("p2", Counters::default())], false, true);
        assert_eq!(page_two(&cache), Counters::new(6, 0));

        assert!(cache.rollback(token));
        assert_eq!(counters_in(&cache, &FeedScope::Global), Counters::new(5, 0));
        assert_eq!(page_two(&cache), Counters::new(5, 0));
    }

    #[test]
    fn commit_reaches_pages_appended_after_begin() {
        let mut cache = seeded(Counters::new(5, 0));
        let id = PostId::new("p1").unwrap();
        let token = cache.begin_optimistic(&id, CounterDelta::likes(1));

        let page2 = PageNumber::new(2).unwrap();
        cache.write(FeedScope::Global, page2, vec![post("p2", Counters::default())], false, true);
        let page3 = PageNumber::new(3).unwrap();
        cache.write(FeedScope::Global, page3, vec![post("p3", Counters::default())], false, true);

        // server says the post was already liked
        assert!(cache.commit(token, CounterDelta::ZERO));
        assert_eq!(counters_in(&cache, &FeedScope::Global), Counters::new(5, 0));
        assert_eq!(page_two(&cache), Counters::new(5, 0));
        let third = cache.read(&FeedScope::Global, page3).unwrap();
        assert_eq!(third.posts()[0].counters, Counters::new(5, 0));
    }

    #[test]
    fn appends_onto_refetched_pages_are_not_carried() {
        let mut cache = seeded(Counters::new(5, 0));
        let id = PostId::new("p1").unwrap();
        let token = cache.begin_optimistic(&id, CounterDelta::likes(1));

        cache.write(
            FeedScope::Global,
            PageNumber::FIRST,
            vec![post("p1", Counters::new(9, 0))],
            true,
            false,
        );
        let page2 = PageNumber::new(2).unwrap();
        cache.write(FeedScope::Global, page2, vec![post("p2", Counters::default())], false, true);
        cache.rollback(token);

        assert_eq!(page_two(&cache), Counters::new(9, 0));
        assert_eq!(counters_in(&cache, &FeedScope::author("alice")), Counters::new(5, 0));
    }

    #[test]
    fn other_patches_survive_resolution() {
        let mut cache = seeded(Counters::new(3, 1));
        let id = PostId::new("p1").unwrap();
        let token = cache.begin_optimistic(&id, CounterDelta::likes(1));
        cache.patch_counters(&id, CounterDelta::comments(1));
        cache.rollback(token);
        assert_eq!(counters_in(&cache, &FeedScope::Global), Counters::new(3, 2));
    }

    #[test]
    fn clear_discards_pending_updates() {
        let mut cache = seeded(Counters::new(3, 1));
        let token = cache.begin_optimistic(&PostId::new("p1").unwrap(), CounterDelta::likes(1));
        cache.clear();
        assert_eq!(cache.pending_optimistic(), 0);
        assert!(!cache.commit(token, CounterDelta::likes(1)));
    }
}
