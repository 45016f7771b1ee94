//! Token sources

use async_trait::async_trait;
use std::error;

pub mod oauth2;

pub use oauth2::dto::TokenResponse;

/// An asynchronous source for freshly issued tokens
#[async_trait]
pub trait AsyncTokenSource: Send + Sync {
    /// The error type returned in the event that retrieving a token fails
    type Error: error::Error + Send + Sync + 'static;

    /// Requests a new token from the source
    async fn request_token(&mut self) -> Result<TokenResponse, Self::Error>;
}
