use color_eyre::Result;
use ndla_tokens::{
    media::FileStoreMedium,
    sources::oauth2::{
        dto::{ClientCredentials, ClientCredentialsWithAudience},
        ClientCredentialsTokenSource, TokenRequestError,
    },
    Audience, ClientId, ClientSecret, CredentialCache, CredentialCacheError, EnvironmentLabelRef,
    TokenEnvironment,
};
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const TOKEN_PATH: &str = "/oauth/token";

fn test_credentials() -> ClientCredentialsWithAudience {
    ClientCredentialsWithAudience {
        credentials: ClientCredentials {
            client_id: ClientId::from_static("test-client"),
            client_secret: ClientSecret::from_static("test-secret"),
        },
        audience: Audience::from_static("ndla_system"),
    }
}

fn source_for(server: &MockServer) -> ClientCredentialsTokenSource {
    let token_url = reqwest::Url::parse(&format!("{}{TOKEN_PATH}", server.uri()))
        .expect("mock server URI is a valid URL");

    ClientCredentialsTokenSource::new(reqwest::Client::new(), token_url, test_credentials())
}

async fn mount_token_endpoint(server: &MockServer, access_token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "grant_type": "client_credentials",
            "client_id": "test-client",
            "client_secret": "test-secret",
            "audience": "ndla_system",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "expires_in": 86400,
            "token_type": "Bearer",
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn label(s: &str) -> &EnvironmentLabelRef {
    EnvironmentLabelRef::from_str(s)
}

#[tokio::test]
async fn token_is_fetched_once_and_reused_across_loads() -> Result<()> {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "issued-token", 1).await;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ndla_m2m_token.json");

    let mut cache = CredentialCache::load(source_for(&server), FileStoreMedium::new(&path)).await;
    let token = cache.access_token(label("docker")).await?;
    assert_eq!(token.as_str(), "issued-token");

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(written["test"]["token"], "issued-token");
    assert_eq!(written["test"]["environment"], "docker");
    assert!(written["test"].get("expiresIn").is_none());
    assert_eq!(
        written["test"]["expires"].as_u64().unwrap() - written["test"]["fetchedAt"].as_u64().unwrap(),
        86_400_000
    );

    let before = std::fs::read_to_string(&path)?;

    // A later process sharing the file reuses the token for any test-bucket label
    let mut cache = CredentialCache::load(source_for(&server), FileStoreMedium::new(&path)).await;
    let token = cache.access_token(label("dev")).await?;
    assert_eq!(token.as_str(), "issued-token");
    assert_eq!(std::fs::read_to_string(&path)?, before);

    Ok(())
}

#[tokio::test]
async fn other_buckets_survive_a_refresh() -> Result<()> {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "staging-token", 1).await;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ndla_m2m_token.json");
    let prod = r#"{"token":"prod-token","environment":"prod","expires":99999999999999,"fetchedAt":1}"#;
    std::fs::write(
        &path,
        format!(r#"{{"prod":{prod},"staging":{{"token":"old","environment":"staging","expires":1,"fetchedAt":0}}}}"#),
    )?;

    let mut cache = CredentialCache::load(source_for(&server), FileStoreMedium::new(&path)).await;
    let store = cache.get_stored_or_create_token(label("staging")).await?;
    assert_eq!(
        store.record(TokenEnvironment::Staging).unwrap().token().as_str(),
        "staging-token"
    );

    let written = std::fs::read_to_string(&path)?;
    assert!(written.starts_with(&format!(r#"{{"prod":{prod},"#)));

    Ok(())
}

#[tokio::test]
async fn corrupt_file_is_recovered_by_refreshing() -> Result<()> {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "fresh", 1).await;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ndla_m2m_token.json");
    std::fs::write(&path, "this is not json")?;

    let mut cache = CredentialCache::load(source_for(&server), FileStoreMedium::new(&path)).await;
    let store = cache.get_stored_or_create_token(label("prod")).await?;
    assert_eq!(store.len(), 1);

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(written.as_object().map(|o| o.len()), Some(1));
    assert_eq!(written["prod"]["token"], "fresh");

    Ok(())
}

#[tokio::test]
async fn authority_error_leaves_file_untouched() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("access_denied"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ndla_m2m_token.json");
    let original = r#"{"prod":{"token":"expired","environment":"prod","expires":1,"fetchedAt":0}}"#;
    std::fs::write(&path, original)?;

    let mut cache = CredentialCache::load(source_for(&server), FileStoreMedium::new(&path)).await;
    let result = cache.get_stored_or_create_token(label("prod")).await;

    match result {
        Err(CredentialCacheError::Refresh(TokenRequestError::ErrorWithBody { body, .. })) => {
            assert_eq!(body, "access_denied");
        }
        other => panic!("expected an authority error, got {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(&path)?, original);

    Ok(())
}

#[tokio::test]
async fn undecodable_response_is_an_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "no-lifetime" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ndla_m2m_token.json");

    let mut cache = CredentialCache::load(source_for(&server), FileStoreMedium::new(&path)).await;
    let result = cache.get_stored_or_create_token(label("prod")).await;

    assert!(matches!(
        result,
        Err(CredentialCacheError::Refresh(TokenRequestError::TokenBodyError(_)))
    ));
    assert!(!path.exists());

    Ok(())
}

#[tokio::test]
async fn unreachable_authority_is_an_error() -> Result<()> {
    // Bind and release a port so nothing is listening on it
    let port = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
    let source = ClientCredentialsTokenSource::new(
        reqwest::Client::new(),
        reqwest::Url::parse(&format!("http://127.0.0.1:{port}{TOKEN_PATH}"))?,
        test_credentials(),
    );

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ndla_m2m_token.json");

    let mut cache = CredentialCache::load(source, FileStoreMedium::new(&path)).await;
    let result = cache.get_stored_or_create_token(label("staging")).await;

    assert!(matches!(
        result,
        Err(CredentialCacheError::Refresh(TokenRequestError::RequestSend(_)))
    ));
    assert!(cache.store().is_empty());

    Ok(())
}
