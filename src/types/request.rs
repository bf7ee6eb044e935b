use serde::Deserialize;

#[derive(Deserialize)]
pub(crate) struct LoginData {
    pub(crate) id: u64,
    pub(crate) timeout: Option<i64>,
    pub(crate) extra: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ExpireData {
    pub(crate) timeout: Option<i64>,
}

#[derive(Deserialize)]
pub(crate) struct ExtraData {
    pub(crate) extra: String,
}
