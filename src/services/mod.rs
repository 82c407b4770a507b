pub mod media;
pub mod notify;
pub mod post_service;
pub mod response_service;
pub mod storage;
