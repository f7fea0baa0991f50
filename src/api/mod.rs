mod posts;

pub use posts::HttpPostsApi;

use crate::error::ApiError;
use crate::feed_cache::FeedScope;
use crate::models::{Comment, LikeOutcome, NewPost, PageNumber, Post, PostId};

/// The remote posts endpoints the feed depends on.
#[allow(async_fn_in_trait)]
pub trait PostsBackend {
    /// One page of the global feed or of an author's posts, newest first.
    async fn fetch_page(
        &self,
        scope: &FeedScope,
        page: PageNumber,
        limit: u32,
    ) -> Result<Vec<Post>, ApiError>;

    /// Toggles the caller's like and returns the resulting state.
    async fn like_post(&self, post_id: &PostId) -> Result<LikeOutcome, ApiError>;

    async fn create_comment(&self, post_id: &PostId, content: &str) -> Result<Comment, ApiError>;

    async fn create_post(&self, draft: &NewPost) -> Result<Post, ApiError>;
}

/// A full page means there may be another one.
pub fn infer_has_more(returned: usize, requested: u32) -> bool {
    returned == requested as usize
}
