pub mod discovery;
pub mod oauth;
