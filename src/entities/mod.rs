pub mod prelude;

pub mod categories;
pub mod post_media;
pub mod posts;
pub mod responses;
pub mod users;
