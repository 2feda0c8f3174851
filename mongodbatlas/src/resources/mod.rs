//! Resource implementations

pub mod database_user;

pub use database_user::DatabaseUserResource;
