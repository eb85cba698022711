table! {
    api_scopes (name) {
        name -> Text,
        display_name -> Nullable<Text>,
    }
}

table! {
    client_grant_types (client_id, grant_type) {
        client_id -> Text,
        grant_type -> Text,
    }
}

table! {
    client_scopes (client_id, scope) {
        client_id -> Text,
        scope -> Text,
    }
}

table! {
    clients (client_id) {
        client_id -> Text,
        secret_hash -> Text,
        name -> Text,
        require_consent -> Bool,
        require_pkce -> Bool,
        rotate_refresh_tokens -> Bool,
    }
}

table! {
    identity_resources (name) {
        name -> Text,
        display_name -> Nullable<Text>,
        claims -> Text,
    }
}

table! {
    persisted_grants (handle) {
        handle -> Text,
        kind -> Text,
        client_id -> Text,
        subject -> Text,
        data -> Text,
        origin -> Nullable<Text>,
        issued_at -> BigInt,
        expires_at -> BigInt,
        consumed -> Bool,
        revoked -> Bool,
    }
}

table! {
    post_logout_uris (client_id, uri) {
        client_id -> Text,
        uri -> Text,
    }
}

table! {
    uris (client_id, uri) {
        client_id -> Text,
        uri -> Text,
    }
}

joinable!(client_grant_types -> clients (client_id));
joinable!(client_scopes -> clients (client_id));
joinable!(post_logout_uris -> clients (client_id));
joinable!(uris -> clients (client_id));

allow_tables_to_appear_in_same_query!(
    api_scopes,
    client_grant_types,
    client_scopes,
    clients,
    identity_resources,
    persisted_grants,
    post_logout_uris,
    uris,
);
