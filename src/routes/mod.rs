pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod router;
pub(crate) mod token;
