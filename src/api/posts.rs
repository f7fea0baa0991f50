use log::{error, info};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::PostsBackend;
use crate::config::FeedConfig;
use crate::error::ApiError;
use crate::feed_cache::FeedScope;
use crate::models::{Comment, LikeOutcome, NewPost, PageNumber, Post, PostId};

#[derive(Deserialize)]
struct PostsResponse {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Serialize)]
struct CommentRequest<'a> {
    content: &'a str,
}

/// `reqwest` client for the posts REST API.
#[derive(Clone, Debug)]
pub struct HttpPostsApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPostsApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.api_base_url.clone())
    }

    /// Bearer token sent with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            error!("posts API request error: {}", e);
            ApiError::Request(e)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("error reading response body: {}", e);
            ApiError::Request(e)
        })?;

        if status == StatusCode::UNAUTHORIZED {
            error!("posts API rejected our credentials");
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            error!("posts API returned {}: {}", status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("JSON parse error: {}. Body: {}", e, body);
            ApiError::JsonParse(e)
        })
    }
}

fn feed_path(scope: &FeedScope) -> String {
    match scope {
        FeedScope::Global => "/posts".to_string(),
        FeedScope::Author(id) => format!("/posts/user/{}", urlencoding::encode(id)),
    }
}

impl PostsBackend for HttpPostsApi {
    async fn fetch_page(
        &self,
        scope: &FeedScope,
        page: PageNumber,
        limit: u32,
    ) -> Result<Vec<Post>, ApiError> {
        info!("fetching page {} of {} from the posts API", page, scope);
        let request = self
            .request(Method::GET, &feed_path(scope))
            .query(&[("page", page.get()), ("limit", limit)]);
        let response: PostsResponse = self.send(request).await?;
        info!("received {} posts", response.posts.len());
        Ok(response.posts)
    }

    async fn like_post(&self, post_id: &PostId) -> Result<LikeOutcome, ApiError> {
        let path = format!("/posts/{}/like", urlencoding::encode(post_id.as_str()));
        self.send(self.request(Method::POST, &path)).await
    }

    async fn create_comment(&self, post_id: &PostId, content: &str) -> Result<Comment, ApiError> {
        let path = format!("/posts/{}/comments", urlencoding::encode(post_id.as_str()));
        let request = self
            .request(Method::POST, &path)
            .json(&CommentRequest { content });
        self.send(request).await
    }

    async fn create_post(&self, draft: &NewPost) -> Result<Post, ApiError> {
        self.send(self.request(Method::POST, "/posts").json(draft)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_ids_are_escaped_in_paths() {
        assert_eq!(feed_path(&FeedScope::Global), "/posts");
        assert_eq!(feed_path(&FeedScope::author("a b/c")), "/posts/user/a%20b%2Fc");
    }

    #[test]
    fn empty_tokens_are_dropped() {
        let api = HttpPostsApi::new("http://localhost:3669/").with_token(Some(String::new()));
        assert!(api.token.is_none());
        assert_eq!(api.base_url, "http://localhost:3669");
    }
}
