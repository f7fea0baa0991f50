use std::{env, fmt::Display, str::FromStr};

use chrono::Duration;
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "http://localhost:3669";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_CACHE_TTL_SECS: i64 = 5 * 60;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub api_base_url: String,
    pub page_size: u32,
    pub cache_ttl_secs: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl FeedConfig {
    /// Reads `NEST_API_URL`, `NEST_PAGE_SIZE` and `NEST_FEED_CACHE_TTL_SECS`,
    /// falling back to defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let page_size = try_load("NEST_PAGE_SIZE", DEFAULT_PAGE_SIZE);
        let cache_ttl_secs = try_load("NEST_FEED_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS);

        Self {
            api_base_url: try_load("NEST_API_URL", DEFAULT_API_URL.to_string()),
            page_size: if page_size == 0 {
                warn!("NEST_PAGE_SIZE must be positive, using default: {}", DEFAULT_PAGE_SIZE);
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            cache_ttl_secs: if cache_ttl_secs <= 0 {
                warn!(
                    "NEST_FEED_CACHE_TTL_SECS must be positive, using default: {}",
                    DEFAULT_CACHE_TTL_SECS
                );
                DEFAULT_CACHE_TTL_SECS
            } else {
                cache_ttl_secs
            },
        }
    }

    /// Out-of-range values give the default TTL.
    pub fn cache_ttl(&self) -> Duration {
        Duration::try_seconds(self.cache_ttl_secs)
            .filter(|ttl| *ttl > Duration::zero())
            .unwrap_or_else(|| {
                warn!(
                    "cache TTL of {}s is out of range, using default: {}",
                    self.cache_ttl_secs, DEFAULT_CACHE_TTL_SECS
                );
                Duration::seconds(DEFAULT_CACHE_TTL_SECS)
            })
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {} value {:?}: {}, using default: {}", key, raw, e, default);
            default
        }),
        Err(_) => {
            info!("{} not set, using default: {}", key, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_feed_behaviour() {
        let config = FeedConfig::default();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.cache_ttl(), Duration::minutes(5));
    }

    #[test]
    fn out_of_range_ttl_falls_back_to_default() {
        let config = FeedConfig {
            cache_ttl_secs: i64::MAX,
            ..FeedConfig::default()
        };
        assert_eq!(config.cache_ttl(), Duration::minutes(5));

        let config = FeedConfig {
            cache_ttl_secs: 90,
            ..FeedConfig::default()
        };
        assert_eq!(config.cache_ttl(), Duration::seconds(90));
    }

    #[test]
    fn try_load_falls_back_on_garbage() {
        env::set_var("NEST_TEST_GARBAGE_PAGE_SIZE", "twenty");
        assert_eq!(try_load("NEST_TEST_GARBAGE_PAGE_SIZE", 7u32), 7);
        env::set_var("NEST_TEST_GOOD_PAGE_SIZE", " 50 ");
        assert_eq!(try_load("NEST_TEST_GOOD_PAGE_SIZE", 7u32), 50);
        assert_eq!(try_load("NEST_TEST_UNSET_PAGE_SIZE", 7u32), 7);
    }
}
