pub use super::categories::Entity as Categories;
pub use super::post_media::Entity as PostMedia;
pub use super::posts::Entity as Posts;
pub use super::responses::Entity as Responses;
pub use super::users::Entity as Users;
