use log::{debug, error, info};

use crate::api::{infer_has_more, PostsBackend};
use crate::error::ApiError;
use crate::feed_cache::{CacheEntry, FeedScope, SharedFeedCache};
use crate::models::{Comment, CounterDelta, NewPost, PageNumber, Post, PostId};

/// What a feed view should show after a load.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedPage {
    pub scope: FeedScope,
    pub page: PageNumber,
    /// Earliest page included in `posts`. Page 1 unless the earlier pages
    /// expired before this one was loaded.
    pub first_page: PageNumber,
    /// Every post from `first_page` through `page`.
    pub posts: Vec<Post>,
    pub has_more: bool,
    pub from_cache: bool,
}

impl FeedPage {
    fn from_entry(scope: &FeedScope, entry: CacheEntry, from_cache: bool) -> Self {
        Self {
            scope: scope.clone(),
            page: entry.page(),
            first_page: entry.first_page(),
            has_more: entry.has_more(),
            posts: entry.posts().to_vec(),
            from_cache,
        }
    }

    /// Folds this page into the posts already on screen. A page that starts
    /// at page 1 replaces them; a partial one is added after them, skipping
    /// posts that are already shown.
    pub fn merge_into(self, shown: &mut Vec<Post>) {
        if self.first_page.is_first() {
            *shown = self.posts;
            return;
        }
        let fresh: Vec<Post> = self
            .posts
            .into_iter()
            .filter(|post| !shown.iter().any(|s| s.id == post.id))
            .collect();
        shown.extend(fresh);
    }
}

/// Cache-first access to the posts API.
#[derive(Clone, Debug)]
pub struct FeedService<B> {
    backend: B,
    cache: SharedFeedCache,
    page_size: u32,
}

impl<B: PostsBackend> FeedService<B> {
    pub fn new(backend: B, cache: SharedFeedCache, page_size: u32) -> Self {
        Self {
            backend,
            cache,
            page_size,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &SharedFeedCache {
        &self.cache
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Serves `page` from the cache unless `reset` is set or the entry is
    /// missing or stale, in which case it is fetched and cached. A failed
    /// fetch leaves the cache as it was.
    pub async fn load_page(
        &self,
        scope: &FeedScope,
        page: PageNumber,
        reset: bool,
    ) -> Result<FeedPage, ApiError> {
        if !reset {
            if let Some(entry) = self.cache.read(scope, page) {
                debug!("returning cached page {} of {}", page, scope);
                return Ok(FeedPage::from_entry(scope, entry, true));
            }
        }

        let posts = self
            .backend
            .fetch_page(scope, page, self.page_size)
            .await
            .map_err(|e| {
                error!("failed to load page {} of {}: {}", page, scope, e);
                e
            })?;

        let has_more = infer_has_more(posts.len(), self.page_size);
        let append = !reset && !page.is_first();
        let entry = self
            .cache
            .with(|cache| cache.write(scope.clone(), page, posts, has_more, append).clone());

        Ok(FeedPage::from_entry(scope, entry, false))
    }

    pub async fn load_more(&self, scope: &FeedScope, current: PageNumber) -> Result<FeedPage, ApiError> {
        self.load_page(scope, current.next(), false).await
    }

    /// Drops every cached page of `scope` and reloads page 1.
    pub async fn refresh(&self, scope: &FeedScope) -> Result<FeedPage, ApiError> {
        self.cache.with(|cache| cache.invalidate(Some(scope)));
        self.load_page(scope, PageNumber::FIRST, true).await
    }

    /// Flips the like on a post. Cached counters move immediately and are
    /// reconciled with the server's answer, or restored if the call fails.
    /// Returns whether the post is now liked.
    pub async fn toggle_like(&self, post_id: &PostId, currently_liked: bool) -> Result<bool, ApiError> {
        let assumed = like_delta(currently_liked, !currently_liked);
        let token = self
            .cache
            .with(|cache| cache.begin_optimistic(post_id, assumed));

        match self.backend.like_post(post_id).await {
            Ok(outcome) => {
                let actual = like_delta(currently_liked, outcome.liked);
                self.cache.with(|cache| cache.commit(token, actual));
                Ok(outcome.liked)
            }
            Err(e) => {
                error!("failed to like post {}: {}", post_id, e);
                self.cache.with(|cache| cache.rollback(token));
                Err(e)
            }
        }
    }

    pub async fn add_comment(&self, post_id: &PostId, content: &str) -> Result<Comment, ApiError> {
        let comment = self.backend.create_comment(post_id, content).await?;
        self.cache
            .with(|cache| cache.patch_counters(post_id, CounterDelta::comments(1)));
        Ok(comment)
    }

    /// Creates a post and puts it at the top of its author's feed and the
    /// global feed.
    pub async fn publish_post(&self, draft: &NewPost) -> Result<Post, ApiError> {
        let post = self.backend.create_post(draft).await?;
        info!("published post {} by {}", post.id, post.author.username);
        let scope = FeedScope::author(post.author.id.clone());
        self.cache.with(|cache| cache.add_post(post.clone(), &scope));
        Ok(post)
    }
}

fn like_delta(was_liked: bool, now_liked: bool) -> CounterDelta {
    match (was_liked, now_liked) {
        (false, true) => CounterDelta::likes(1),
        (true, false) => CounterDelta::likes(-1),
        _ => CounterDelta::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::like_delta;
    use crate::models::CounterDelta;

    #[test]
    fn like_delta_follows_state_change() {
        assert_eq!(like_delta(false, true), CounterDelta::likes(1));
        assert_eq!(like_delta(true, false), CounterDelta::likes(-1));
        assert_eq!(like_delta(true, true), CounterDelta::ZERO);
        assert_eq!(like_delta(false, false), CounterDelta::ZERO);
    }
}
