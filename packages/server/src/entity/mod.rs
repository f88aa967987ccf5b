pub mod asset;
pub mod comment;
pub mod project;
pub mod user;
pub mod version;
