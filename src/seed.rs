//! Idempotent reconciliation of static configuration into a store.
//!
//! Runs once at process start and from `kagi-util seed`. Records are keyed
//! by their natural key, so applying the same document twice is a no-op.

use tracing::{event, Level};

use crate::auth::{ConfigStore, Upsert};
use crate::core::models::{ApiScope, Client, IdentityResource};
use crate::provider::Error;

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub identity_resources: Vec<IdentityResource>,
    #[serde(default)]
    pub api_scopes: Vec<ApiScope>,
}

impl SeedData {
    pub fn from_file(path: &str) -> Result<Self, Error> {
        let contents = std::fs::read(path)?;
        Ok(serde_json::from_slice(&contents)?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SeedReport {
    fn record(&mut self, outcome: Upsert) {
        match outcome {
            Upsert::Inserted => self.inserted += 1,
            Upsert::Updated => self.updated += 1,
            Upsert::Unchanged => self.unchanged += 1,
        }
    }
}

/// Resources go in before clients so the scope check below sees them.
#[tracing::instrument(skip_all)]
pub async fn reconcile(store: &dyn ConfigStore, data: &SeedData) -> Result<SeedReport, Error> {
    let mut report = SeedReport::default();

    for resource in &data.identity_resources {
        report.record(store.upsert_identity_resource(resource).await?);
    }

    for scope in &data.api_scopes {
        report.record(store.upsert_api_scope(scope).await?);
    }

    let defined = store.list_resources().await?.names();
    for client in &data.clients {
        let undefined = client.allowed_scopes.difference(&defined);
        if !undefined.is_empty() {
            event!(
                Level::WARN,
                client_id = %client.id,
                scopes = %undefined,
                "Client allows scopes that are not defined"
            );
        }

        report.record(store.upsert_client(client).await?);
    }

    event!(
        Level::INFO,
        inserted = report.inserted,
        updated = report.updated,
        unchanged = report.unchanged,
        "Seeded configuration"
    );
    Ok(report)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::{DbStore, MemoryStore};

    const SEED: &str = r#"{
        "identity_resources": [
            { "name": "openid", "claims": ["sub"] },
            { "name": "profile", "claims": ["name", "email"] }
        ],
        "api_scopes": [
            { "name": "api1", "display_name": "My API" }
        ],
        "clients": [
            {
                "client_id": "client1",
                "secret_hash": "$argon2i$v=19$m=4096,t=3,p=1$c2FsdA$aGFzaA",
                "allowed_grant_types": ["authorization_code"],
                "redirect_uris": ["https://localhost:5002/signin-oidc"],
                "allowed_scopes": "openid profile api1"
            }
        ]
    }"#;

    fn seed() -> SeedData {
        serde_json::from_str(SEED).unwrap()
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let store = MemoryStore::new();
        let data = seed();

        let first = reconcile(&store, &data).await.unwrap();
        assert_eq!(first.inserted, 4);

        let second = reconcile(&store, &data).await.unwrap();
        assert_eq!(
            second,
            SeedReport {
                inserted: 0,
                updated: 0,
                unchanged: 4
            }
        );
        assert_eq!(store.list_clients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reseeding_database_leaves_no_duplicates() {
        let store = DbStore::in_memory().unwrap();
        store.migrate().await.unwrap();
        let data = seed();

        reconcile(&store, &data).await.unwrap();
        let second = reconcile(&store, &data).await.unwrap();
        assert_eq!(second.unchanged, 4);

        let clients = store.list_clients().await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].redirect_uris.len(), 1);
        assert!(clients[0].rotate_refresh_tokens);
        assert_eq!(store.list_resources().await.unwrap().names().as_joined(), "api1 openid profile");
    }

    #[tokio::test]
    async fn changed_client_is_updated() {
        let store = MemoryStore::new();
        let mut data = seed();
        reconcile(&store, &data).await.unwrap();

        data.clients[0].require_pkce = true;
        let report = reconcile(&store, &data).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 3);
    }
}
