pub mod library;
pub mod user;
