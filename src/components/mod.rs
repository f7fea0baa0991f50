pub mod post_card;
pub mod post_composer;
pub mod posts_feed;
pub mod user_avatar;
