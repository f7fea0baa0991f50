use std::fmt;
use std::num::NonZeroU32;
use std::ops::{Add, Neg, Sub};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Opaque post identifier as handed out by the API.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyPostId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PostId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PostId> for String {
    fn from(id: PostId) -> Self {
        id.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 1-based page index into a paginated feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageNumber(NonZeroU32);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(NonZeroU32::MIN);

    pub fn new(page: u32) -> Result<Self, ValidationError> {
        NonZeroU32::new(page)
            .map(Self)
            .ok_or(ValidationError::InvalidPage(page))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn is_first(self) -> bool {
        self == Self::FIRST
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn prev(self) -> Option<Self> {
        NonZeroU32::new(self.0.get() - 1).map(Self)
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl Author {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self.username.clone(),
        }
    }
}

/// Signed change to a post's counters. Each field may be negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDelta {
    pub likes: i64,
    pub comments: i64,
}

impl CounterDelta {
    pub const ZERO: CounterDelta = CounterDelta { likes: 0, comments: 0 };

    pub fn new(likes: i64, comments: i64) -> Self {
        Self { likes, comments }
    }

    pub fn likes(likes: i64) -> Self {
        Self { likes, comments: 0 }
    }

    pub fn comments(comments: i64) -> Self {
        Self { likes: 0, comments }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Add for CounterDelta {
    type Output = CounterDelta;

    fn add(self, rhs: Self) -> Self::Output {
        CounterDelta::new(
            self.likes.saturating_add(rhs.likes),
            self.comments.saturating_add(rhs.comments),
        )
    }
}

impl Sub for CounterDelta {
    type Output = CounterDelta;

    fn sub(self, rhs: Self) -> Self::Output {
        CounterDelta::new(
            self.likes.saturating_sub(rhs.likes),
            self.comments.saturating_sub(rhs.comments),
        )
    }
}

impl Neg for CounterDelta {
    type Output = CounterDelta;

    fn neg(self) -> Self::Output {
        CounterDelta::new(self.likes.saturating_neg(), self.comments.saturating_neg())
    }
}

/// Engagement counters; never negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub likes: u32,
    pub comments: u32,
}

impl Counters {
    pub fn new(likes: u32, comments: u32) -> Self {
        Self { likes, comments }
    }

    /// Applies `delta`, clamping each field to `0..=u32::MAX`.
    pub fn apply(self, delta: CounterDelta) -> Counters {
        Counters {
            likes: clamp_add(self.likes, delta.likes),
            comments: clamp_add(self.comments, delta.comments),
        }
    }

    /// The delta that turns `before` into `self`.
    pub fn delta_since(self, before: Counters) -> CounterDelta {
        CounterDelta::new(
            i64::from(self.likes) - i64::from(before.likes),
            i64::from(self.comments) - i64::from(before.comments),
        )
    }
}

fn clamp_add(value: u32, delta: i64) -> u32 {
    i64::from(value).saturating_add(delta).clamp(0, i64::from(u32::MAX)) as u32
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub content: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<MediaKind>,
    pub created_at: DateTime<Utc>,
    pub author: Author,
    #[serde(rename = "_count", default)]
    pub counters: Counters,
}

impl Post {
    pub fn new(id: PostId, author: Author, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            content: content.into(),
            media_url: None,
            media_type: None,
            created_at,
            author,
            counters: Counters::default(),
        }
    }

    pub fn with_media(mut self, url: impl Into<String>, kind: MediaKind) -> Self {
        self.media_url = Some(url.into());
        self.media_type = Some(kind);
        self
    }

    pub fn with_counters(mut self, counters: Counters) -> Self {
        self.counters = counters;
        self
    }
}

/// Payload for creating a post.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaKind>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<Author>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub liked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_start_at_one() {
        assert_eq!(PageNumber::new(0), Err(ValidationError::InvalidPage(0)));
        let page = PageNumber::new(2).unwrap();
        assert_eq!(page.get(), 2);
        assert_eq!(page.prev(), Some(PageNumber::FIRST));
        assert_eq!(PageNumber::FIRST.prev(), None);
        assert_eq!(PageNumber::FIRST.next(), page);
    }

    #[test]
    fn empty_post_ids_are_rejected() {
        assert_eq!(PostId::new("  "), Err(ValidationError::EmptyPostId));
        assert!(serde_json::from_str::<PostId>("\"\"").is_err());
    }

    #[test]
    fn counters_clamp_at_zero() {
        let counters = Counters::new(0, 3);
        assert_eq!(counters.apply(CounterDelta::new(-1, -5)), Counters::new(0, 0));
        assert_eq!(counters.apply(CounterDelta::likes(2)), Counters::new(2, 3));
    }

    #[test]
    fn extreme_deltas_saturate() {
        let counters = Counters::new(5, 2);
        assert_eq!(
            counters.apply(CounterDelta::new(i64::MAX, i64::MIN)),
            Counters::new(u32::MAX, 0)
        );
        assert_eq!(-CounterDelta::likes(i64::MIN), CounterDelta::likes(i64::MAX));
        assert_eq!(
            CounterDelta::likes(i64::MAX) + CounterDelta::likes(1),
            CounterDelta::likes(i64::MAX)
        );
        assert_eq!(
            CounterDelta::comments(i64::MIN) - CounterDelta::comments(1),
            CounterDelta::comments(i64::MIN)
        );
    }

    #[test]
    fn delta_since_reverses_apply() {
        let before = Counters::new(5, 2);
        let after = before.apply(CounterDelta::new(1, -1));
        assert_eq!(after.delta_since(before), CounterDelta::new(1, -1));
    }

    #[test]
    fn parses_api_post_shape() {
        let body = r#"{
            "id": "p1",
            "content": "new comeback teaser",
            "mediaUrl": "/uploads/teaser.mp4",
            "mediaType": "video",
            "createdAt": "2024-05-01T12:00:00Z",
            "author": {"id": "u1", "username": "alice", "firstName": "Alice"},
            "_count": {"likes": 5, "comments": 2}
        }"#;

        let post: Post = serde_json::from_str(body).unwrap();
        assert_eq!(post.id.as_str(), "p1");
        assert_eq!(post.media_type, Some(MediaKind::Video));
        assert_eq!(post.counters, Counters::new(5, 2));
        assert_eq!(post.author.display_name(), "Alice");
    }

    #[test]
    fn new_post_omits_missing_media() {
        let draft = NewPost {
            content: "hello".to_string(),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&draft).unwrap(), r#"{"content":"hello"}"#);
    }
}
