//! DTOs for interacting with OAuth2 token endpoints

use ndla_clock::DurationSecs;
use serde::{Deserialize, Serialize, Serializer};

use crate::{AccessToken, Audience, AudienceRef, ClientId, ClientIdRef, ClientSecret};

/// Client credentials
#[derive(Debug, Serialize)]
pub struct ClientCredentials {
    /// The client ID
    pub client_id: ClientId,

    /// The client secret
    pub client_secret: ClientSecret,
}

/// Client credentials with an audience
#[derive(Debug)]
pub struct ClientCredentialsWithAudience {
    /// The client credentials
    pub credentials: ClientCredentials,

    /// The target audience
    pub audience: Audience,
}

impl ClientCredentialsWithAudience {
    /// The grant type sent with these credentials
    pub const GRANT_TYPE: &'static str = "client_credentials";

    /// The client ID of the client making the request
    pub fn client_id(&self) -> &ClientIdRef {
        &self.credentials.client_id
    }

    /// The audience the token is requested for
    pub fn audience(&self) -> &AudienceRef {
        &self.audience
    }
}

impl Serialize for ClientCredentialsWithAudience {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut ser = serializer.serialize_struct("ClientCredentialsWithAudience", 4)?;
        ser.serialize_field("grant_type", Self::GRANT_TYPE)?;
        ser.serialize_field("client_id", &self.credentials.client_id)?;
        ser.serialize_field("client_secret", &self.credentials.client_secret)?;
        ser.serialize_field("audience", &self.audience)?;
        ser.end()
    }
}

/// A token issued by the authority
///
/// Authorities report the token lifetime as `expires_in`. Some responses also
/// carry a camelCase `expiresIn`; that value is kept separately and passed
/// through to the cached record untouched, while expiry is always computed
/// from `expires_in`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// The bearer token
    pub access_token: AccessToken,

    /// The lifetime of the token
    pub expires_in: DurationSecs,

    /// The camelCase `expiresIn` field, if present and numeric
    #[serde(
        rename = "expiresIn",
        default,
        deserialize_with = "crate::record::lenient_secs"
    )]
    pub advertised_expires_in: Option<DurationSecs>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_serialize_with_grant_type() {
        let credentials = ClientCredentialsWithAudience {
            credentials: ClientCredentials {
                client_id: ClientId::from_static("client"),
                client_secret: ClientSecret::from_static("secret"),
            },
            audience: Audience::from_static("ndla_system"),
        };

        let json = serde_json::to_value(&credentials).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "grant_type": "client_credentials",
                "client_id": "client",
                "client_secret": "secret",
                "audience": "ndla_system",
            })
        );
    }

    #[test]
    fn camel_case_lifetime_is_read_separately() {
        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token":"abc","expires_in":86400,"token_type":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(resp.expires_in, DurationSecs(86_400));
        assert_eq!(resp.advertised_expires_in, None);

        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"abc","expires_in":60,"expiresIn":30}"#)
                .unwrap();
        assert_eq!(resp.expires_in, DurationSecs(60));
        assert_eq!(resp.advertised_expires_in, Some(DurationSecs(30)));
    }

    #[test]
    fn snake_case_lifetime_is_required() {
        let result = serde_json::from_str::<TokenResponse>(r#"{"access_token":"abc","expiresIn":30}"#);
        assert!(result.is_err());
    }
}
