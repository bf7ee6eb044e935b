pub(crate) mod auth;
pub mod snowflake;
