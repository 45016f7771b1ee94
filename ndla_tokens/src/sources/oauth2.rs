//! A token source that uses an OAuth2 server as an authority

use async_trait::async_trait;
use thiserror::Error;

use super::AsyncTokenSource;

pub mod dto;

/// A token source performing the client credentials flow
///
/// Credentials are posted to the token URL as a JSON body. Each call makes a
/// single request: there is no retry, timeout, or backoff beyond what the
/// provided [`reqwest::Client`] was configured with.
#[derive(Debug)]
pub struct ClientCredentialsTokenSource {
    client: reqwest::Client,
    token_url: reqwest::Url,
    credentials: dto::ClientCredentialsWithAudience,
}

impl ClientCredentialsTokenSource {
    /// Constructs a new client credentials source
    pub fn new(
        client: reqwest::Client,
        token_url: reqwest::Url,
        credentials: dto::ClientCredentialsWithAudience,
    ) -> Self {
        Self {
            client,
            token_url,
            credentials,
        }
    }

    /// The URL tokens are requested from
    pub fn token_url(&self) -> &reqwest::Url {
        &self.token_url
    }
}

#[async_trait]
impl AsyncTokenSource for ClientCredentialsTokenSource {
    type Error = TokenRequestError;

    async fn request_token(&mut self) -> Result<dto::TokenResponse, Self::Error> {
        request_token(&self.client, self.token_url.clone(), &self.credentials).await
    }
}

/// An error while attempting to request a new token from the authority
#[derive(Debug, Error)]
pub enum TokenRequestError {
    /// An error from the authority with an error body
    #[error("error requesting token from authority: {body}")]
    ErrorWithBody {
        /// The underlying request error
        source: reqwest::Error,
        /// The body of the error
        body: String,
    },
    /// Unable to deserialize the token body
    #[error("error deserializing token body from authority")]
    TokenBodyError(#[from] serde_json::Error),
    /// Unable to read the response
    #[error("error reading response body")]
    BodyReadError(#[source] reqwest::Error),
    /// Unable to send a token request to the authority
    #[error("error sending request to authority")]
    RequestSend(#[source] reqwest::Error),
}

#[tracing::instrument(
    err,
    skip(client, token_url, credentials),
    fields(
        token_url = %token_url,
        credentials.grant_type = dto::ClientCredentialsWithAudience::GRANT_TYPE,
        credentials.client_id = %credentials.client_id(),
        credentials.audience = %credentials.audience(),
    ),
)]
async fn request_token(
    client: &reqwest::Client,
    token_url: reqwest::Url,
    credentials: &dto::ClientCredentialsWithAudience,
) -> Result<dto::TokenResponse, TokenRequestError> {
    tracing::trace!("requesting token from authority");

    let resp = client
        .post(token_url)
        .json(credentials)
        .send()
        .await
        .map_err(TokenRequestError::RequestSend)?;

    tracing::debug!(
        response.status = resp.status().as_u16(),
        "received token response from issuing authority"
    );

    if let Err(error) = resp.error_for_status_ref() {
        let body = resp
            .text()
            .await
            .map_err(TokenRequestError::BodyReadError)?;
        return Err(TokenRequestError::ErrorWithBody {
            source: error,
            body,
        });
    }

    let body = resp
        .bytes()
        .await
        .map_err(TokenRequestError::BodyReadError)?;
    let resp: dto::TokenResponse = serde_json::from_slice(&body)?;

    tracing::info!(
        lifetime = resp.expires_in.0,
        has_camel_case_lifetime = resp.advertised_expires_in.is_some(),
        "received new token"
    );

    Ok(resp)
}
