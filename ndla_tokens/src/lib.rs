//! Environment-scoped caching of OAuth2 client credentials tokens
//!
//! Machine-to-machine callers of the NDLA APIs need a bearer token for the
//! environment they are talking to. Fetching a new token on every invocation
//! is slow and wears on the token authority's rate limits, so this crate keeps
//! the tokens it obtains in a small JSON store file and hands them out again
//! until they expire.
//!
//! Tokens are cached per _bucket_ rather than per environment label: `prod`
//! and `staging` each get a bucket, and every other label (`dev`, `docker`,
//! `test`, …) shares the `test` bucket. A token fetched while working against
//! `docker` is therefore reused when the same developer later targets `dev`.
//!
//! # Example
//!
//! ```
//! use ndla_tokens::{
//!     media::FileStoreMedium, sources, Audience, ClientId, ClientSecret, CredentialCache,
//!     EnvironmentLabel,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = sources::oauth2::dto::ClientCredentialsWithAudience {
//!     credentials: sources::oauth2::dto::ClientCredentials {
//!         client_id: ClientId::from_static("client"),
//!         client_secret: ClientSecret::from_static("secret"),
//!     },
//!     audience: Audience::from_static("ndla_system"),
//! };
//!
//! let source = sources::oauth2::ClientCredentialsTokenSource::new(
//!     reqwest::Client::new(),
//!     reqwest::Url::parse("https://auth.example.com/oauth/token")?,
//!     credentials,
//! );
//!
//! let mut cache =
//!     CredentialCache::load(source, FileStoreMedium::new("ndla_m2m_token.json")).await;
//!
//! let environment = EnvironmentLabel::from_static("staging");
//! let token = cache.access_token(&environment).await?;
//! # let _ = token;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
mod cache;
mod environment;
pub mod media;
mod record;
pub mod sources;
pub mod store;

pub use braids::*;
pub use cache::{CredentialCache, CredentialCacheError, DEFAULT_EXPIRY_MARGIN};
pub use environment::{TokenEnvironment, UnknownBucket};
pub use record::TokenRecord;
pub use store::TokenStore;
