//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database and media storage operations; both the
//! HTML pages and the REST API go through them.

mod feed;
mod posting;
mod social;

pub use feed::{FeedService, GroupFeed, PostDetail, Profile};
pub use posting::{FormResult, PostService};
pub use social::{LikeCount, LikeResponse, SocialService};
