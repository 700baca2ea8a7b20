pub mod category;
pub mod comment;
pub mod message;
pub mod post;
pub mod post_tag;
pub mod profile;
pub mod student;
pub mod tag;
pub mod user;
