pub mod asset;
pub mod auth;
pub mod comment;
pub mod project;
pub mod version;
