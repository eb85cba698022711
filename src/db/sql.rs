use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use tracing::{event, Level};

use crate::auth::{ConfigStore, GrantStore, Upsert};
use crate::core::models::{
    ApiScope, Client, GrantKind, IdentityResource, PersistedGrant, Resources,
};
use crate::core::types::{
    ClientId, GrantHandle, GrantType, HashedClientSecret, RedirectUri, Scope,
};
use crate::provider::error::Error;

use super::models;
use super::schema;

embed_migrations!("migrations");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Configuration and grant store on SQLite. Queries run on tokio's blocking
/// pool so request tasks never block a runtime worker.
#[derive(Clone)]
pub struct DbStore {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Debug for DbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbStore").finish()
    }
}

impl DbStore {
    pub fn acquire(uri: &str) -> Result<Self, Error> {
        Self::with_max_size(uri, 10)
    }

    /// A private in-memory database. The pool holds a single connection,
    /// since every SQLite in-memory connection is its own database.
    pub fn in_memory() -> Result<Self, Error> {
        Self::with_max_size(":memory:", 1)
    }

    fn with_max_size(uri: &str, max_size: u32) -> Result<Self, Error> {
        let pool = Pool::builder()
            .max_size(max_size)
            .connection_customizer(Box::new(ConnectionOptions {
                busy_timeout: BUSY_TIMEOUT,
            }))
            .build(ConnectionManager::new(uri))?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        self.run(|conn| {
            embedded_migrations::run(conn)?;
            Ok(())
        })
        .await?;
        event!(Level::INFO, "Ran migrations");
        Ok(())
    }

    async fn run<T, F>(&self, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteConnection) -> Result<T, Error> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await?
    }
}

fn load_client(conn: &SqliteConnection, id: &str) -> Result<Option<Client>, Error> {
    use schema::client_grant_types::dsl as grant_types;
    use schema::client_scopes::dsl as scopes;
    use schema::clients::dsl::clients;
    use schema::post_logout_uris::dsl as post_logout_uris;
    use schema::uris::dsl as uris;

    let row = match clients.find(id).first::<models::Client>(conn).optional()? {
        Some(row) => row,
        None => return Ok(None),
    };

    let redirect_uris = uris::uris
        .filter(uris::client_id.eq(id))
        .select(uris::uri)
        .load::<String>(conn)?;
    let post_logout_redirect_uris = post_logout_uris::post_logout_uris
        .filter(post_logout_uris::client_id.eq(id))
        .select(post_logout_uris::uri)
        .load::<String>(conn)?;
    let allowed_scopes = scopes::client_scopes
        .filter(scopes::client_id.eq(id))
        .select(scopes::scope)
        .load::<String>(conn)?;
    let allowed_grant_types = grant_types::client_grant_types
        .filter(grant_types::client_id.eq(id))
        .select(grant_types::grant_type)
        .load::<String>(conn)?
        .into_iter()
        .filter_map(|g| match g.parse::<GrantType>() {
            Ok(grant_type) => Some(grant_type),
            Err(e) => {
                event!(Level::WARN, client_id = id, error = %e, "Ignoring stored grant type");
                None
            }
        })
        .collect();

    Ok(Some(Client {
        id: ClientId(row.client_id),
        name: row.name,
        secret: HashedClientSecret(row.secret_hash),
        allowed_grant_types,
        redirect_uris: redirect_uris.into_iter().map(RedirectUri).collect(),
        post_logout_redirect_uris: post_logout_redirect_uris
            .into_iter()
            .map(RedirectUri)
            .collect(),
        allowed_scopes: Scope::from_parts(allowed_scopes),
        require_consent: row.require_consent,
        require_pkce: row.require_pkce,
        rotate_refresh_tokens: row.rotate_refresh_tokens,
    }))
}

fn write_client(conn: &SqliteConnection, client: &Client) -> Result<(), Error> {
    use schema::client_grant_types::dsl as grant_types;
    use schema::client_scopes::dsl as scopes;
    use schema::clients::dsl::clients;
    use schema::post_logout_uris::dsl as post_logout_uris;
    use schema::uris::dsl as uris;

    let id = &client.id.0;

    diesel::replace_into(clients)
        .values(models::Client {
            client_id: id.clone(),
            secret_hash: client.secret.0.clone(),
            name: client.name.clone(),
            require_consent: client.require_consent,
            require_pkce: client.require_pkce,
            rotate_refresh_tokens: client.rotate_refresh_tokens,
        })
        .execute(conn)?;

    diesel::delete(uris::uris.filter(uris::client_id.eq(id))).execute(conn)?;
    diesel::delete(post_logout_uris::post_logout_uris.filter(post_logout_uris::client_id.eq(id)))
        .execute(conn)?;
    diesel::delete(scopes::client_scopes.filter(scopes::client_id.eq(id))).execute(conn)?;
    diesel::delete(grant_types::client_grant_types.filter(grant_types::client_id.eq(id)))
        .execute(conn)?;

    let uri_rows: Vec<models::Uri> = client
        .redirect_uris
        .iter()
        .map(|u| models::Uri {
            client_id: id.clone(),
            uri: u.0.clone(),
        })
        .collect();
    diesel::insert_into(uris::uris).values(&uri_rows).execute(conn)?;

    let post_logout_rows: Vec<models::PostLogoutUri> = client
        .post_logout_redirect_uris
        .iter()
        .map(|u| models::PostLogoutUri {
            client_id: id.clone(),
            uri: u.0.clone(),
        })
        .collect();
    diesel::insert_into(post_logout_uris::post_logout_uris)
        .values(&post_logout_rows)
        .execute(conn)?;

    let scope_rows: Vec<models::ClientScope> = client
        .allowed_scopes
        .borrow_parts()
        .map(|s| models::ClientScope {
            client_id: id.clone(),
            scope: s.to_string(),
        })
        .collect();
    diesel::insert_into(scopes::client_scopes)
        .values(&scope_rows)
        .execute(conn)?;

    let grant_type_rows: Vec<models::ClientGrantType> = client
        .allowed_grant_types
        .iter()
        .map(|g| models::ClientGrantType {
            client_id: id.clone(),
            grant_type: g.as_str().to_string(),
        })
        .collect();
    diesel::insert_into(grant_types::client_grant_types)
        .values(&grant_type_rows)
        .execute(conn)?;

    Ok(())
}

fn to_identity_resource(row: models::IdentityResource) -> Result<IdentityResource, Error> {
    Ok(IdentityResource {
        name: row.name,
        display_name: row.display_name,
        claims: serde_json::from_str(&row.claims)?,
    })
}

fn to_api_scope(row: models::ApiScope) -> ApiScope {
    ApiScope {
        name: row.name,
        display_name: row.display_name,
    }
}

fn to_grant(row: models::PersistedGrant) -> Result<PersistedGrant, Error> {
    let kind: GrantKind = row.kind.parse().map_err(Error::StoreUnavailable)?;

    Ok(PersistedGrant {
        handle: GrantHandle(row.handle),
        kind,
        client_id: ClientId(row.client_id),
        subject: row.subject,
        data: serde_json::from_str(&row.data)?,
        origin: row.origin.map(GrantHandle),
        issued_at: row.issued_at,
        expires_at: row.expires_at,
        consumed: row.consumed,
        revoked: row.revoked,
    })
}

fn from_grant(grant: &PersistedGrant) -> Result<models::PersistedGrant, Error> {
    Ok(models::PersistedGrant {
        handle: grant.handle.0.clone(),
        kind: grant.kind.as_str().to_string(),
        client_id: grant.client_id.0.clone(),
        subject: grant.subject.clone(),
        data: serde_json::to_string(&grant.data)?,
        origin: grant.origin.as_ref().map(|o| o.0.clone()),
        issued_at: grant.issued_at,
        expires_at: grant.expires_at,
        consumed: grant.consumed,
        revoked: grant.revoked,
    })
}

#[async_trait]
impl ConfigStore for DbStore {
    async fn get_client(&self, client_id: &ClientId) -> Result<Client, Error> {
        let id = client_id.0.clone();
        self.run(move |conn| {
            load_client(conn, &id)?.ok_or_else(|| Error::ConfigNotFound(format!("client {}", id)))
        })
        .await
    }

    async fn get_scopes(&self, names: &Scope) -> Result<Resources, Error> {
        use schema::api_scopes::dsl::{self as api, api_scopes};
        use schema::identity_resources::dsl::{self as identity, identity_resources};

        let requested = names.clone();
        self.run(move |conn| {
            let parts = requested.as_parts();
            let identity = identity_resources
                .filter(identity::name.eq_any(&parts))
                .load::<models::IdentityResource>(conn)?
                .into_iter()
                .map(to_identity_resource)
                .collect::<Result<Vec<_>, _>>()?;
            let api = api_scopes
                .filter(api::name.eq_any(&parts))
                .load::<models::ApiScope>(conn)?
                .into_iter()
                .map(to_api_scope)
                .collect();

            let resources = Resources { identity, api };
            resources.ensure_covers(&requested)?;
            Ok(resources)
        })
        .await
    }

    async fn list_clients(&self) -> Result<Vec<Client>, Error> {
        use schema::clients::dsl::{self, clients};

        self.run(|conn| {
            let ids = clients
                .select(dsl::client_id)
                .order(dsl::client_id)
                .load::<String>(conn)?;

            let mut found = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(client) = load_client(conn, &id)? {
                    found.push(client);
                }
            }
            Ok(found)
        })
        .await
    }

    async fn list_resources(&self) -> Result<Resources, Error> {
        use schema::api_scopes::dsl::{self as api, api_scopes};
        use schema::identity_resources::dsl::{self as identity, identity_resources};

        self.run(|conn| {
            let identity = identity_resources
                .order(identity::name)
                .load::<models::IdentityResource>(conn)?
                .into_iter()
                .map(to_identity_resource)
                .collect::<Result<Vec<_>, _>>()?;
            let api = api_scopes
                .order(api::name)
                .load::<models::ApiScope>(conn)?
                .into_iter()
                .map(to_api_scope)
                .collect();

            Ok(Resources { identity, api })
        })
        .await
    }

    async fn upsert_client(&self, client: &Client) -> Result<Upsert, Error> {
        let client = client.clone();
        self.run(move |conn| {
            conn.transaction::<_, Error, _>(|| {
                let outcome = match load_client(conn, &client.id.0)? {
                    Some(existing) if existing == client => return Ok(Upsert::Unchanged),
                    Some(_) => Upsert::Updated,
                    None => Upsert::Inserted,
                };

                write_client(conn, &client)?;
                Ok(outcome)
            })
        })
        .await
    }

    async fn upsert_identity_resource(&self, resource: &IdentityResource) -> Result<Upsert, Error> {
        use schema::identity_resources::dsl::identity_resources;

        let row = models::IdentityResource {
            name: resource.name.clone(),
            display_name: resource.display_name.clone(),
            claims: serde_json::to_string(&resource.claims)?,
        };
        let resource = resource.clone();

        self.run(move |conn| {
            conn.transaction::<_, Error, _>(|| {
                let existing = identity_resources
                    .find(&row.name)
                    .first::<models::IdentityResource>(conn)
                    .optional()?
                    .map(to_identity_resource)
                    .transpose()?;

                let outcome = match existing {
                    Some(existing) if existing == resource => return Ok(Upsert::Unchanged),
                    Some(_) => Upsert::Updated,
                    None => Upsert::Inserted,
                };

                diesel::replace_into(identity_resources)
                    .values(&row)
                    .execute(conn)?;
                Ok(outcome)
            })
        })
        .await
    }

    async fn upsert_api_scope(&self, scope: &ApiScope) -> Result<Upsert, Error> {
        use schema::api_scopes::dsl::api_scopes;

        let row = models::ApiScope {
            name: scope.name.clone(),
            display_name: scope.display_name.clone(),
        };

        self.run(move |conn| {
            conn.transaction::<_, Error, _>(|| {
                let existing = api_scopes
                    .find(&row.name)
                    .first::<models::ApiScope>(conn)
                    .optional()?;

                let outcome = match existing {
                    Some(existing) if existing == row => return Ok(Upsert::Unchanged),
                    Some(_) => Upsert::Updated,
                    None => Upsert::Inserted,
                };

                diesel::replace_into(api_scopes).values(&row).execute(conn)?;
                Ok(outcome)
            })
        })
        .await
    }
}

#[async_trait]
impl GrantStore for DbStore {
    async fn put(&self, grant: &PersistedGrant) -> Result<(), Error> {
        use schema::persisted_grants::dsl::persisted_grants;

        let row = from_grant(grant)?;
        self.run(move |conn| {
            diesel::insert_into(persisted_grants)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, handle: &GrantHandle) -> Result<Option<PersistedGrant>, Error> {
        use schema::persisted_grants::dsl::persisted_grants;

        let handle = handle.0.clone();
        self.run(move |conn| {
            persisted_grants
                .find(&handle)
                .first::<models::PersistedGrant>(conn)
                .optional()?
                .map(to_grant)
                .transpose()
        })
        .await
    }

    async fn atomic_consume(&self, handle: &GrantHandle) -> Result<bool, Error> {
        use schema::persisted_grants::dsl::{self, persisted_grants};

        let handle = handle.0.clone();
        self.run(move |conn| {
            let updated = diesel::update(
                persisted_grants
                    .find(&handle)
                    .filter(dsl::consumed.eq(false))
                    .filter(dsl::revoked.eq(false)),
            )
            .set(dsl::consumed.eq(true))
            .execute(conn)?;

            Ok(updated == 1)
        })
        .await
    }

    async fn revoke(&self, handle: &GrantHandle) -> Result<(), Error> {
        use schema::persisted_grants::dsl::{self, persisted_grants};

        let handle = handle.0.clone();
        self.run(move |conn| {
            diesel::update(persisted_grants.find(&handle))
                .set(dsl::revoked.eq(true))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn revoke_family(&self, origin: &GrantHandle) -> Result<u64, Error> {
        use schema::persisted_grants::dsl::{self, persisted_grants};

        let origin = origin.0.clone();
        self.run(move |conn| {
            let revoked = diesel::update(
                persisted_grants
                    .filter(dsl::origin.eq(&origin))
                    .filter(dsl::revoked.eq(false)),
            )
            .set(dsl::revoked.eq(true))
            .execute(conn)?;
            Ok(revoked as u64)
        })
        .await
    }

    async fn revoke_all_for_subject(&self, subject: &str, client_id: &ClientId) -> Result<u64, Error> {
        use schema::persisted_grants::dsl::{self, persisted_grants};

        let subject = subject.to_string();
        let client_id = client_id.0.clone();
        self.run(move |conn| {
            let revoked = diesel::update(
                persisted_grants
                    .filter(dsl::subject.eq(&subject))
                    .filter(dsl::client_id.eq(&client_id))
                    .filter(dsl::revoked.eq(false)),
            )
            .set(dsl::revoked.eq(true))
            .execute(conn)?;
            Ok(revoked as u64)
        })
        .await
    }

    async fn remove_expired(&self, now: i64) -> Result<u64, Error> {
        use schema::persisted_grants::dsl::{self, persisted_grants};

        self.run(move |conn| {
            conn.transaction::<_, Error, _>(|| {
                let live_origins: Vec<String> = persisted_grants
                    .filter(dsl::expires_at.gt(now))
                    .filter(dsl::origin.is_not_null())
                    .select(dsl::origin)
                    .distinct()
                    .load::<Option<String>>(conn)?
                    .into_iter()
                    .flatten()
                    .collect();

                let removed = diesel::delete(
                    persisted_grants
                        .filter(dsl::expires_at.le(now))
                        .filter(dsl::handle.ne_all(live_origins)),
                )
                .execute(conn)?;
                Ok(removed as u64)
            })
        })
        .await
    }
}
