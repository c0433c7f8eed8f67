mod bookmark;
mod channel;
mod feed;
mod post;
mod tag;

pub use bookmark::Bookmark;
pub use channel::{normalize_username, Channel, ChannelUpdate, NewChannel};
pub use feed::{Feed, FeedRef, FeedUpdate, NewFeed, VIRTUAL_FEED_NAME};
pub use post::{post_id, NewPost, Page, Post, PostFilter, PostUpdate};
pub use tag::{AuthorType, NewTag, Tag, TagWithCount};
