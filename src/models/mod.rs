pub mod posts;

pub use posts::{
    Author, Comment, CounterDelta, Counters, LikeOutcome, MediaKind, NewPost, PageNumber, Post,
    PostId,
};
