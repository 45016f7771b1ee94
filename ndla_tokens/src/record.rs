use ndla_clock::{DurationMillis, DurationSecs, UnixMillis};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::{AccessToken, AccessTokenRef, EnvironmentLabel, EnvironmentLabelRef, TokenEnvironment};

/// A cached bearer token along with the environment and times it was fetched for
///
/// Read from and written to the persisted store file using the field names
/// `expiresIn`, `token`, `environment`, `expires` and `fetchedAt`. Stores are
/// shared with other tools, so `expiresIn` and `fetchedAt` are read leniently:
/// a missing or non-integer value reads as `None` rather than making the
/// record unreadable.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenRecord {
    #[serde(rename = "expiresIn", default, deserialize_with = "lenient_secs")]
    expires_in: Option<DurationSecs>,
    token: AccessToken,
    environment: EnvironmentLabel,
    expires: UnixMillis,
    #[serde(rename = "fetchedAt", default, deserialize_with = "lenient_millis")]
    fetched_at: Option<UnixMillis>,
}

/// The parts of a stored record that decide whether it can be handed out
#[derive(Debug, Deserialize)]
pub(crate) struct RecordValidity {
    environment: EnvironmentLabel,
    expires: UnixMillis,
}

impl RecordValidity {
    pub(crate) fn is_valid_for(
        &self,
        requested: &EnvironmentLabelRef,
        now: UnixMillis,
        margin: DurationMillis,
    ) -> bool {
        self.expires >= now - margin && requested.shares_bucket_with(&self.environment)
    }
}

/// Reads an optional whole number of seconds, treating anything else as absent
pub(crate) fn lenient_secs<'de, D>(deserializer: D) -> Result<Option<DurationSecs>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_u64().map(DurationSecs))
}

fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<UnixMillis>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_u64().map(UnixMillis))
}

impl TokenRecord {
    /// Constructs a record for a token fetched at `fetched_at` that the
    /// authority reported as living for `lifetime`
    ///
    /// `advertised_expires_in` is stored as-is and plays no part in expiry.
    pub fn new(
        token: AccessToken,
        advertised_expires_in: Option<DurationSecs>,
        environment: EnvironmentLabel,
        fetched_at: UnixMillis,
        lifetime: DurationSecs,
    ) -> Self {
        Self {
            expires_in: advertised_expires_in,
            token,
            environment,
            expires: fetched_at + lifetime,
            fetched_at: Some(fetched_at),
        }
    }

    /// Gets the bearer token
    #[inline]
    pub fn token(&self) -> &AccessTokenRef {
        &self.token
    }

    /// Gets the lifetime carried through from the authority's `expiresIn` field
    #[inline]
    pub fn expires_in(&self) -> Option<DurationSecs> {
        self.expires_in
    }

    /// Gets the raw environment label the token was fetched under
    #[inline]
    pub fn environment(&self) -> &EnvironmentLabelRef {
        &self.environment
    }

    /// Gets the bucket the token was fetched for
    #[inline]
    pub fn bucket(&self) -> TokenEnvironment {
        self.environment.bucket()
    }

    /// Gets the time at which the token expires
    #[inline]
    pub fn expires(&self) -> UnixMillis {
        self.expires
    }

    /// Gets the time at which the token was fetched, if it was recorded
    #[inline]
    pub fn fetched_at(&self) -> Option<UnixMillis> {
        self.fetched_at
    }

    /// Whether the token expired before `now - margin`
    ///
    /// A token expiring exactly at `now - margin` is still usable.
    #[inline]
    pub fn is_expired_at(&self, now: UnixMillis, margin: DurationMillis) -> bool {
        self.expires < now - margin
    }

    /// Whether the token can be handed out for a request made under `requested`
    pub fn is_valid_for(
        &self,
        requested: &EnvironmentLabelRef,
        now: UnixMillis,
        margin: DurationMillis,
    ) -> bool {
        !self.is_expired_at(now, margin) && requested.shares_bucket_with(&self.environment)
    }

    /// The entry written for this record in the persisted store
    pub(crate) fn to_entry(&self) -> Value {
        let mut entry = Map::new();
        if let Some(expires_in) = self.expires_in {
            entry.insert("expiresIn".to_owned(), expires_in.0.into());
        }
        entry.insert("token".to_owned(), self.token.as_str().into());
        entry.insert("environment".to_owned(), self.environment.as_str().into());
        entry.insert("expires".to_owned(), self.expires.0.into());
        if let Some(fetched_at) = self.fetched_at {
            entry.insert("fetchedAt".to_owned(), fetched_at.0.into());
        }
        Value::Object(entry)
    }
}
