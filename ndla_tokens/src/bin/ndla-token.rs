//! Prints a bearer token for an NDLA environment, reusing a cached one when possible

use std::path::PathBuf;

use clap::Parser;
use ndla_tokens::{
    media::FileStoreMedium, sources, Audience, ClientId, ClientSecret, CredentialCache,
    EnvironmentLabel,
};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Opts {
    /// The environment to obtain a token for, such as `prod`, `staging`, or `dev`
    #[arg(short, long, env = "NDLA_ENVIRONMENT")]
    environment: EnvironmentLabel,

    /// The issuing authority's token request URL
    #[arg(short = 'u', long, env = "AUTH0_ENDPOINT")]
    token_url: reqwest::Url,

    /// The client ID of the client
    #[arg(short, long, env = "AUTH0_CLIENT_ID")]
    client_id: ClientId,

    /// The client secret used to identify the client to the issuing authority
    #[arg(short = 's', long, env = "AUTH0_CLIENT_SECRET", hide_env_values = true)]
    client_secret: ClientSecret,

    /// The audience to request a token for
    #[arg(short, long, env = "AUTH0_AUDIENCE")]
    audience: Audience,

    /// The local file used to cache tokens
    #[arg(
        short = 'f',
        long,
        env = "NDLA_TOKEN_FILE",
        value_name = "FILE",
        default_value = "ndla_m2m_token.json"
    )]
    token_file: PathBuf,

    /// Print the whole token store instead of just the token
    #[arg(long)]
    print_store: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let credentials = sources::oauth2::dto::ClientCredentialsWithAudience {
        credentials: sources::oauth2::dto::ClientCredentials {
            client_id: opts.client_id,
            client_secret: opts.client_secret,
        },
        audience: opts.audience,
    };

    let source = sources::oauth2::ClientCredentialsTokenSource::new(
        reqwest::Client::new(),
        opts.token_url,
        credentials,
    );

    let mut cache = CredentialCache::load(source, FileStoreMedium::new(opts.token_file)).await;

    if opts.print_store {
        let store = cache.get_stored_or_create_token(&opts.environment).await?;
        println!("{}", store.to_json());
    } else {
        let token = cache.access_token(&opts.environment).await?;
        println!("{token:#}");
    }

    Ok(())
}
