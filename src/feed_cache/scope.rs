use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::PageNumber;

/// Which feed a page belongs to: the global feed or one author's profile feed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedScope {
    Global,
    Author(String),
}

impl FeedScope {
    pub fn author(user_id: impl Into<String>) -> Self {
        FeedScope::Author(user_id.into())
    }

    /// `None` selects the global feed.
    pub fn from_author_filter(user_id: Option<String>) -> Self {
        user_id.map_or(FeedScope::Global, FeedScope::Author)
    }

    pub fn is_global(&self) -> bool {
        matches!(self, FeedScope::Global)
    }

    pub fn author_id(&self) -> Option<&str> {
        match self {
            FeedScope::Global => None,
            FeedScope::Author(id) => Some(id),
        }
    }
}

impl fmt::Display for FeedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedScope::Global => f.write_str("feed"),
            FeedScope::Author(id) => write!(f, "user-{}", id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    pub scope: FeedScope,
    pub page: PageNumber,
}

impl ScopeKey {
    pub fn new(scope: FeedScope, page: PageNumber) -> Self {
        Self { scope, page }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.scope, self.page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_scopes_do_not_collide_on_prefix() {
        let al = ScopeKey::new(FeedScope::author("al"), PageNumber::FIRST);
        let alice = ScopeKey::new(FeedScope::author("alice"), PageNumber::FIRST);
        assert_ne!(al, alice);
        assert_eq!(alice.to_string(), "user-alice-1");
        assert_eq!(ScopeKey::new(FeedScope::Global, PageNumber::FIRST).to_string(), "feed-1");
    }

    #[test]
    fn missing_author_filter_is_global() {
        assert!(FeedScope::from_author_filter(None).is_global());
        assert_eq!(
            FeedScope::from_author_filter(Some("bob".to_string())).author_id(),
            Some("bob")
        );
    }
}
