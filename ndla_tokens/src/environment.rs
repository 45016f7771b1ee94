//! Deployment environments and their cache buckets

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::EnvironmentLabelRef;

/// The cache bucket a deployment environment belongs to
///
/// Only `prod` and `staging` have buckets of their own. Every other label,
/// such as `dev`, `docker` or `test`, shares the [`Test`](Self::Test) bucket,
/// so a token fetched under one of those labels satisfies requests made under
/// any of the others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenEnvironment {
    /// Production
    Prod,
    /// Staging
    Staging,
    /// Any other environment
    Test,
}

impl TokenEnvironment {
    /// All buckets, in the order they are usually listed
    pub const ALL: [TokenEnvironment; 3] = [Self::Prod, Self::Staging, Self::Test];

    /// Normalizes a raw environment label to its bucket
    ///
    /// Matching is exact and case-sensitive: `PROD` lands in the test bucket.
    pub fn from_label(label: &str) -> Self {
        match label {
            "prod" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Test,
        }
    }

    /// The key used for this bucket in the persisted store
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for TokenEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned when parsing a string that is not a bucket key
#[derive(Debug, Error)]
#[error("unknown token environment bucket: {0:?}")]
pub struct UnknownBucket(String);

impl FromStr for TokenEnvironment {
    type Err = UnknownBucket;

    /// Parses a bucket key strictly, unlike [`TokenEnvironment::from_label`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| UnknownBucket(s.to_owned()))
    }
}

impl EnvironmentLabelRef {
    /// The bucket this label normalizes to
    #[inline]
    pub fn bucket(&self) -> TokenEnvironment {
        TokenEnvironment::from_label(self.as_str())
    }

    /// Whether this label and `other` share a bucket
    ///
    /// An empty label never matches anything, including another empty label.
    pub fn shares_bucket_with(&self, other: &EnvironmentLabelRef) -> bool {
        if self.as_str().is_empty() || other.as_str().is_empty() {
            return false;
        }

        self.bucket() == other.bucket()
    }
}
