mod feeds;
mod posts;
mod schema;
mod store;
mod types;
mod users;

pub use schema::Database;
pub use store::Store;
pub use types::{Feed, FeedFollowRecord, FeedListing, NewPost, Post, StoreError, User};
