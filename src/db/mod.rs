mod bookmarks;
mod channels;
mod feeds;
mod posts;
mod repository;
mod schema;
mod tags;

pub use repository::Repository;
