//! The persisted mapping from environment buckets to cached tokens

use ndla_clock::{DurationMillis, UnixMillis};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    media::AsyncStoreMedium, record::RecordValidity, EnvironmentLabelRef, TokenEnvironment,
    TokenRecord,
};

/// All cached tokens, keyed by the bucket they were fetched for
///
/// Entries are kept as raw JSON and only interpreted when looked up, so that
/// entries this process does not touch are written back exactly as they were
/// read, in the same order. An entry that cannot be read as a
/// [`TokenRecord`] behaves as if it were absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenStore {
    entries: Map<String, Value>,
}

/// An error encountered while parsing a persisted token store
#[derive(Debug, Error)]
pub enum StoreParseError {
    /// The content is not valid JSON
    #[error("token store is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),
    /// The content is JSON, but not an object
    #[error("token store is not a JSON object")]
    NotAnObject,
}

impl TokenStore {
    /// Constructs an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the textual form of a store
    pub fn parse(text: &str) -> Result<Self, StoreParseError> {
        match serde_json::from_str(text.trim())? {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(StoreParseError::NotAnObject),
        }
    }

    /// Reads the store from `medium`, treating anything unreadable as an empty store
    pub async fn load<M: AsyncStoreMedium + ?Sized>(medium: &mut M) -> Self {
        let text = match medium.read_to_string().await {
            Ok(text) => text,
            Err(error) => {
                tracing::info!(error = &error as &dyn std::error::Error, "no token store found");
                return Self::new();
            }
        };

        match Self::parse(&text) {
            Ok(store) => {
                tracing::debug!(entries = store.len(), "loaded token store");
                store
            }
            Err(error) => {
                tracing::info!(
                    error = &error as &dyn std::error::Error,
                    "ignoring unreadable token store"
                );
                Self::new()
            }
        }
    }

    /// Serializes the store into its compact textual form
    pub fn to_json(&self) -> String {
        // Serializing a map of JSON values cannot fail
        Value::Object(self.entries.clone()).to_string()
    }

    /// Gets the record for `bucket`, if one is present and well-formed
    pub fn record(&self, bucket: TokenEnvironment) -> Option<TokenRecord> {
        let entry = self.entries.get(bucket.as_str())?;
        match TokenRecord::deserialize(entry) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::debug!(
                    %bucket,
                    error = &error as &dyn std::error::Error,
                    "ignoring malformed token record"
                );
                None
            }
        }
    }

    /// Stores `record` under `bucket`, replacing any prior entry for that bucket
    ///
    /// All other entries are left as they are.
    pub fn insert(&mut self, bucket: TokenEnvironment, record: &TokenRecord) {
        self.entries.insert(bucket.as_str().to_owned(), record.to_entry());
    }

    /// Whether the store holds a token that can be handed out for a request
    /// made under `requested` at time `now`
    ///
    /// The token for the requested bucket must not have expired before
    /// `now - margin`, and it must have been fetched under a label that shares
    /// the requested label's bucket. Only `expires` and `environment` are
    /// consulted; a record missing either, or holding them in the wrong shape,
    /// is invalid.
    pub fn is_valid_for(
        &self,
        requested: &EnvironmentLabelRef,
        now: UnixMillis,
        margin: DurationMillis,
    ) -> bool {
        let bucket = requested.bucket();
        let Some(entry) = self.entries.get(bucket.as_str()) else {
            return false;
        };

        match RecordValidity::deserialize(entry) {
            Ok(validity) => validity.is_valid_for(requested, now, margin),
            Err(error) => {
                tracing::debug!(
                    %bucket,
                    error = &error as &dyn std::error::Error,
                    "ignoring malformed token record"
                );
                false
            }
        }
    }

    /// The buckets that have an entry, well-formed or not
    pub fn buckets(&self) -> impl Iterator<Item = TokenEnvironment> + '_ {
        self.entries.keys().filter_map(|key| key.parse().ok())
    }

    /// The number of entries in the store
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
