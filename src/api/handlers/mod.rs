pub mod auth;
pub mod categories;
pub mod health;
pub mod media;
pub mod posts;
pub mod responses;
