//! Process-local store, for tests and deployments that can afford to lose
//! every grant on restart.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::auth::{ConfigStore, GrantStore, Upsert};
use crate::core::models::{ApiScope, Client, IdentityResource, PersistedGrant, Resources};
use crate::core::types::{ClientId, GrantHandle, Scope};
use crate::provider::error::Error;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    clients: Arc<DashMap<ClientId, Client>>,
    identity_resources: Arc<DashMap<String, IdentityResource>>,
    api_scopes: Arc<DashMap<String, ApiScope>>,
    grants: Arc<DashMap<GrantHandle, PersistedGrant>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn upsert<K, V>(map: &DashMap<K, V>, key: K, value: &V) -> Upsert
where
    K: Eq + Hash,
    V: Clone + PartialEq,
{
    match map.entry(key) {
        Entry::Occupied(mut entry) => {
            if entry.get() == value {
                Upsert::Unchanged
            } else {
                entry.insert(value.clone());
                Upsert::Updated
            }
        }
        Entry::Vacant(entry) => {
            entry.insert(value.clone());
            Upsert::Inserted
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get_client(&self, client_id: &ClientId) -> Result<Client, Error> {
        self.clients
            .get(client_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::ConfigNotFound(format!("client {}", client_id)))
    }

    async fn get_scopes(&self, names: &Scope) -> Result<Resources, Error> {
        let identity = names
            .borrow_parts()
            .filter_map(|name| self.identity_resources.get(name).map(|r| r.value().clone()))
            .collect();
        let api = names
            .borrow_parts()
            .filter_map(|name| self.api_scopes.get(name).map(|s| s.value().clone()))
            .collect();

        let resources = Resources { identity, api };
        resources.ensure_covers(names)?;
        Ok(resources)
    }

    async fn list_clients(&self) -> Result<Vec<Client>, Error> {
        let mut clients: Vec<Client> = self.clients.iter().map(|c| c.value().clone()).collect();
        clients.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(clients)
    }

    async fn list_resources(&self) -> Result<Resources, Error> {
        let mut identity: Vec<IdentityResource> = self
            .identity_resources
            .iter()
            .map(|r| r.value().clone())
            .collect();
        identity.sort_by(|a, b| a.name.cmp(&b.name));

        let mut api: Vec<ApiScope> = self.api_scopes.iter().map(|s| s.value().clone()).collect();
        api.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Resources { identity, api })
    }

    async fn upsert_client(&self, client: &Client) -> Result<Upsert, Error> {
        Ok(upsert(&self.clients, client.id.clone(), client))
    }

    async fn upsert_identity_resource(&self, resource: &IdentityResource) -> Result<Upsert, Error> {
        Ok(upsert(&self.identity_resources, resource.name.clone(), resource))
    }

    async fn upsert_api_scope(&self, scope: &ApiScope) -> Result<Upsert, Error> {
        Ok(upsert(&self.api_scopes, scope.name.clone(), scope))
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn put(&self, grant: &PersistedGrant) -> Result<(), Error> {
        self.grants.insert(grant.handle.clone(), grant.clone());
        Ok(())
    }

    async fn get(&self, handle: &GrantHandle) -> Result<Option<PersistedGrant>, Error> {
        Ok(self.grants.get(handle).map(|g| g.value().clone()))
    }

    async fn atomic_consume(&self, handle: &GrantHandle) -> Result<bool, Error> {
        // get_mut holds the shard's write lock for the whole check-and-set.
        Ok(match self.grants.get_mut(handle) {
            Some(mut grant) if !grant.consumed && !grant.revoked => {
                grant.consumed = true;
                true
            }
            _ => false,
        })
    }

    async fn revoke(&self, handle: &GrantHandle) -> Result<(), Error> {
        if let Some(mut grant) = self.grants.get_mut(handle) {
            grant.revoked = true;
        }
        Ok(())
    }

    async fn revoke_family(&self, origin: &GrantHandle) -> Result<u64, Error> {
        let mut revoked = 0;
        for mut grant in self.grants.iter_mut() {
            if grant.origin.as_ref() == Some(origin) && !grant.revoked {
                grant.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_all_for_subject(&self, subject: &str, client_id: &ClientId) -> Result<u64, Error> {
        let mut revoked = 0;
        for mut grant in self.grants.iter_mut() {
            if grant.subject == subject && &grant.client_id == client_id && !grant.revoked {
                grant.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn remove_expired(&self, now: i64) -> Result<u64, Error> {
        let live_origins: HashSet<GrantHandle> = self
            .grants
            .iter()
            .filter(|grant| !grant.is_expired(now))
            .filter_map(|grant| grant.origin.clone())
            .collect();

        let mut removed = 0;
        self.grants.retain(|handle, grant| {
            let keep = !grant.is_expired(now) || live_origins.contains(handle);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
