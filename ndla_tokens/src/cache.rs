//! The environment-scoped credential cache

use std::{error, fmt, io};

use ndla_clock::{Clock, DurationMillis, System};
use thiserror::Error;

use crate::{
    media::AsyncStoreMedium, sources::AsyncTokenSource, AccessToken, EnvironmentLabelRef,
    TokenEnvironment, TokenRecord, TokenStore,
};

/// The slack allowed when deciding whether a cached token has expired
pub const DEFAULT_EXPIRY_MARGIN: DurationMillis = DurationMillis(10);

/// A token cache backed by a persisted [`TokenStore`] and a fallback token source
///
/// The store is read from the medium once, when the cache is loaded. Requests
/// for an environment are answered from the store while its token is valid.
/// Otherwise a new token is requested from the source and the whole store,
/// with that environment's bucket replaced, is written back to the medium.
pub struct CredentialCache<S, M, C = System> {
    source: S,
    medium: M,
    store: TokenStore,
    expiry_margin: DurationMillis,
    clock: C,
}

/// An error while obtaining a token from the credential cache
#[derive(Debug, Error)]
pub enum CredentialCacheError<E: error::Error + 'static> {
    /// The token source failed to issue a new token
    #[error("unable to refresh token from authority")]
    Refresh(#[source] E),
    /// The refreshed store could not be written back
    #[error("unable to persist token store")]
    Persist(#[source] io::Error),
    /// The store has no usable token for the requested bucket
    #[error("no usable token stored for the {0} environment")]
    MissingToken(TokenEnvironment),
}

impl<S, M> CredentialCache<S, M, System>
where
    M: AsyncStoreMedium,
{
    /// Constructs a credential cache, reading the current store from `medium`
    ///
    /// A store that is missing or cannot be read is treated as empty.
    pub async fn load(source: S, mut medium: M) -> Self {
        let store = TokenStore::load(&mut medium).await;
        Self {
            source,
            medium,
            store,
            expiry_margin: DEFAULT_EXPIRY_MARGIN,
            clock: System,
        }
    }
}

impl<S, M, C> CredentialCache<S, M, C> {
    /// Sets the slack allowed when deciding whether a token has expired
    ///
    /// A token remains valid until `now - margin` has passed its expiry.
    pub fn with_expiry_margin(mut self, margin: DurationMillis) -> Self {
        self.expiry_margin = margin;
        self
    }

    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> CredentialCache<S, M, D> {
        CredentialCache {
            source: self.source,
            medium: self.medium,
            store: self.store,
            expiry_margin: self.expiry_margin,
            clock,
        }
    }

    /// The current token store
    pub fn store(&self) -> &TokenStore {
        &self.store
    }
}

impl<S, M, C> CredentialCache<S, M, C>
where
    S: AsyncTokenSource,
    M: AsyncStoreMedium,
    C: Clock,
{
    /// Whether the store holds a valid token for `environment` right now
    pub fn token_is_valid(&self, environment: &EnvironmentLabelRef) -> bool {
        self.store
            .is_valid_for(environment, self.clock.now(), self.expiry_margin)
    }

    /// Returns the token store, refreshing the token for `environment` first
    /// if the stored one is missing, expired, or from another bucket
    ///
    /// A store hit makes no request and no write. A miss makes exactly one
    /// request to the token source and one full write of the store.
    #[tracing::instrument(
        skip_all,
        fields(environment = %environment, bucket = %environment.bucket()),
    )]
    pub async fn get_stored_or_create_token(
        &mut self,
        environment: &EnvironmentLabelRef,
    ) -> Result<&TokenStore, CredentialCacheError<S::Error>> {
        if self.token_is_valid(environment) {
            tracing::debug!("using stored token");
            return Ok(&self.store);
        }

        self.refetch_token(environment).await
    }

    /// Requests a new token for `environment` and persists it, regardless of
    /// what is currently stored
    ///
    /// On failure neither the medium nor the in-memory store is changed.
    #[tracing::instrument(err, skip_all, fields(environment = %environment))]
    pub async fn refetch_token(
        &mut self,
        environment: &EnvironmentLabelRef,
    ) -> Result<&TokenStore, CredentialCacheError<S::Error>> {
        let bucket = environment.bucket();
        tracing::info!(%bucket, "fetching token");

        let fetched_at = self.clock.now();
        let resp = self
            .source
            .request_token()
            .await
            .map_err(CredentialCacheError::Refresh)?;

        let record = TokenRecord::new(
            resp.access_token,
            resp.advertised_expires_in,
            environment.to_owned(),
            fetched_at,
            resp.expires_in,
        );

        let mut store = self.store.clone();
        store.insert(bucket, &record);
        self.medium
            .write_all(&store.to_json())
            .await
            .map_err(CredentialCacheError::Persist)?;

        tracing::debug!(
            %bucket,
            fetched_at = fetched_at.0,
            expires = record.expires().0,
            "stored new token"
        );

        self.store = store;
        Ok(&self.store)
    }

    /// Gets a usable bearer token for `environment`, refreshing it if needed
    pub async fn access_token(
        &mut self,
        environment: &EnvironmentLabelRef,
    ) -> Result<AccessToken, CredentialCacheError<S::Error>> {
        let bucket = environment.bucket();
        let store = self.get_stored_or_create_token(environment).await?;
        store
            .record(bucket)
            .map(|record| record.token().to_owned())
            .ok_or(CredentialCacheError::MissingToken(bucket))
    }
}

impl<S, M, C> fmt::Debug for CredentialCache<S, M, C>
where
    S: fmt::Debug,
    M: fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CredentialCache")
            .field("source", &self.source)
            .field("medium", &self.medium)
            .field("buckets", &self.store.buckets().collect::<Vec<_>>())
            .field("expiry_margin", &self.expiry_margin)
            .field("clock", &self.clock)
            .finish()
    }
}
