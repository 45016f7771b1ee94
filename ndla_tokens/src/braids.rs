use aliri_braid::braid;
use std::fmt;

macro_rules! limited_reveal {
    ($ty:ty: $hidden:literal, $default:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    limited_reveal(&self.0, &mut *f, $default)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    limited_reveal(&self.0, &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }
    };
}

/// Writes at most `f.width()` (or `default_len`) characters of `unprotected`,
/// ending with an ellipsis when truncated
fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        return f.write_str("…");
    }

    if unprotected.chars().nth(max_len).is_none() {
        return f.write_str(unprotected);
    }

    match unprotected.char_indices().nth(max_len - 1) {
        Some((idx, _)) => {
            f.write_str(&unprotected[..idx])?;
            f.write_str("…")
        }
        None => f.write_str(unprotected),
    }
}

/// A client ID
#[braid(serde)]
pub struct ClientId;

/// A client secret
#[braid(serde, debug = "owned", display = "owned")]
pub struct ClientSecret;

limited_reveal!(ClientSecretRef: "CLIENT SECRET", 5);

/// The audience (API identifier) a token is requested for
#[braid(serde)]
pub struct Audience;

/// A bearer access token
#[braid(serde, debug = "owned", display = "owned")]
pub struct AccessToken;

limited_reveal!(AccessTokenRef: "ACCESS TOKEN", 15);

/// A raw, non-normalized deployment environment label such as `prod` or `docker`
///
/// Labels are compared by the [`TokenEnvironment`](crate::TokenEnvironment)
/// bucket they normalize to, never by their raw text.
#[braid(serde)]
pub struct EnvironmentLabel;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_hidden_by_default() {
        let secret = ClientSecret::from_static("super-secret-value");
        assert_eq!(format!("{secret}"), "***CLIENT SECRET***");
        assert_eq!(format!("{secret:?}"), "***CLIENT SECRET***");
    }

    #[test]
    fn alternate_formatting_reveals_a_prefix() {
        let token = AccessToken::from_static("eyJhbGciOiJSUzI1NiJ9.payload.signature");
        assert_eq!(format!("{token:#?}"), "\"eyJhbGciOiJSUz…\"");
        assert_eq!(format!("{token:#6}"), "eyJhb…");
        assert_eq!(
            format!("{token:#}"),
            "eyJhbGciOiJSUzI1NiJ9.payload.signature"
        );
    }

    #[test]
    fn short_values_are_not_truncated() {
        let token = AccessToken::from_static("abc");
        assert_eq!(format!("{token:#?}"), "\"abc\"");
    }
}
