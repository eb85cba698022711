use crate::auth::ConfigStore;
use crate::core::types::ClientSecret;
use crate::db::DbStore;
use crate::provider::Error;
use crate::seed::{self, SeedData};
use crate::util::hash::HashingService;

use clap::Parser;

#[derive(Parser)]
#[clap(
    name = "kagi-util",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS")
)]
pub struct Options {
    #[clap(long, env = "DATABASE_URL")]
    database_url: String,
    #[clap(long, env = "HASH_SECRET")]
    hash_secret: String,
    #[clap(subcommand)]
    command: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    /// Run pending database migrations
    Migrate,
    /// Apply a seed document to the configuration store
    Seed(Seed),
    ListClients,
    /// Print the hash of a client secret or user password
    HashSecret(HashSecret),
}

#[derive(Parser)]
struct Seed {
    #[clap(short, long)]
    file: String,
}

#[derive(Parser)]
struct HashSecret {
    #[clap(short, long)]
    secret: String,
}

fn get_hasher(secret: &str) -> HashingService {
    HashingService::with_secret_key(secret.to_string())
}

async fn get_database(opts: &Options) -> Result<DbStore, Error> {
    let store = DbStore::acquire(&opts.database_url)?;
    store.migrate().await?;
    Ok(store)
}

async fn seed(c: &Seed, opts: &Options) -> Result<(), Error> {
    let store = get_database(opts).await?;
    let data = SeedData::from_file(&c.file)?;

    let report = seed::reconcile(&store, &data).await?;
    println!(
        "inserted: {}, updated: {}, unchanged: {}",
        report.inserted, report.updated, report.unchanged
    );
    Ok(())
}

async fn list_clients(opts: &Options) -> Result<(), Error> {
    let store = get_database(opts).await?;

    for client in store.list_clients().await? {
        println!("{} (name: \"{}\")", client.id, client.name);
        for uri in &client.redirect_uris {
            println!("  redirect_uri: {}", uri.0);
        }
        println!("  scope: {}", client.allowed_scopes);
    }
    Ok(())
}

fn hash_secret(c: &HashSecret, opts: &Options) -> Result<(), Error> {
    let hasher = get_hasher(&opts.hash_secret);
    let hashed = hasher.hash(&ClientSecret(c.secret.clone()))?;

    println!("{}", hashed.0);
    Ok(())
}

pub async fn run_cli_action(opts: Options) -> Result<(), Error> {
    use SubCommand::*;

    match &opts.command {
        Migrate => get_database(&opts).await.map(|_| ()),
        Seed(c) => seed(c, &opts).await,
        ListClients => list_clients(&opts).await,
        HashSecret(c) => hash_secret(c, &opts),
    }
}
