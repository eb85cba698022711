use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{event, Level};

use crate::db::DbStore;
use crate::http::Server;
use crate::provider::{
    identity::StaticIdentityProvider, keys::PemKeyProvider, token::TokenService, Error,
    OAuth2Provider, ProviderSettings,
};
use crate::seed::{self, SeedData};
use crate::util::hash::HashingService;

#[derive(Parser, Debug)]
#[clap(
    name = "kagid",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS")
)]
pub struct DaemonOptions {
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: String,
    #[clap(long, env = "HASH_SECRET", hide_env_values = true)]
    pub hash_secret: String,
    #[clap(long, env = "JWT_PRIVATE_KEY_FILE")]
    pub jwt_private_key_file: String,
    #[clap(long, env = "JWT_PUBLIC_KEY_FILE")]
    pub jwt_public_key_file: String,
    #[clap(long, env = "ISSUER")]
    pub issuer: String,
    #[clap(long, env = "PUBLIC_URL")]
    pub public_url: String,
    #[clap(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8001")]
    pub listen_addr: SocketAddr,
    #[clap(long, env = "SEED_FILE")]
    pub seed_file: Option<String>,
    #[clap(long, env = "USERS_FILE")]
    pub users_file: String,
    #[clap(long, env = "CODE_TTL_SECS", default_value = "60")]
    pub code_ttl_secs: u64,
    #[clap(long, env = "REFRESH_TOKEN_TTL_SECS", default_value = "2592000")]
    pub refresh_token_ttl_secs: u64,
    #[clap(long, env = "ACCESS_TOKEN_TTL_SECS", default_value = "900")]
    pub access_token_ttl_secs: u64,
    #[clap(long, env = "CLEAN_UP_INTERVAL_SECS", default_value = "15")]
    pub clean_up_interval_secs: u64,
}

/// Migrates and seeds the store, then serves until the process is killed.
pub async fn run(opts: DaemonOptions) -> Result<(), Error> {
    let store = Arc::new(DbStore::acquire(&opts.database_url)?);
    store.migrate().await?;

    if let Some(path) = &opts.seed_file {
        let data = SeedData::from_file(path)?;
        seed::reconcile(store.as_ref(), &data).await?;
    }

    let hasher = HashingService::with_secret_key(opts.hash_secret.clone());
    let identity = StaticIdentityProvider::from_file(&opts.users_file, hasher.clone())?;
    let keys = PemKeyProvider::from_files(&opts.jwt_private_key_file, &opts.jwt_public_key_file)?;
    let token = TokenService::new(
        Arc::new(keys),
        opts.issuer.clone(),
        Duration::from_secs(opts.access_token_ttl_secs),
    );

    let settings = ProviderSettings {
        code_ttl: Duration::from_secs(opts.code_ttl_secs),
        refresh_token_ttl: Duration::from_secs(opts.refresh_token_ttl_secs),
    };

    let provider = Arc::new(OAuth2Provider::new(
        store.clone(),
        store,
        Arc::new(identity),
        token,
        hasher,
        settings,
    ));

    provider.start_clean_up_worker(Duration::from_secs(opts.clean_up_interval_secs));

    event!(Level::INFO, addr = %opts.listen_addr, issuer = %opts.issuer, "Starting kagid");
    Server::new(provider, opts.public_url).serve(opts.listen_addr).await;
    Ok(())
}
