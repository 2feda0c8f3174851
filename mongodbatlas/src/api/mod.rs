//! MongoDB Atlas Admin API client

pub mod client;
pub mod cloud_backup;
pub mod clusters;
pub mod common;
pub mod containers;
pub mod database_users;
pub mod error;
pub mod streams;

pub use client::{Client, ClientConfig, Credentials, DEFAULT_BASE_URL};
pub use common::Label;
pub use error::ApiError;

use std::future::Future;
use tfplug::Context;

/// Run an API call under the request context, aborting it on cancellation
pub async fn cancellable<T, F>(ctx: &Context, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    ctx.run(fut).await.map_err(|_| ApiError::Cancelled)?
}
