#[macro_use]
extern crate diesel;

#[macro_use]
extern crate diesel_migrations;

pub mod core;
pub mod auth;
pub mod http;
pub mod db;
pub mod util;
pub mod oidc;
pub mod provider;
pub mod seed;
pub mod daemon;
