use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct Login {
    pub(crate) token: String,
}

impl Login {
    pub(crate) fn new(token: String) -> Self {
        Self { token }
    }
}

#[derive(Serialize)]
pub(crate) struct Updated {
    pub(crate) updated: bool,
}

#[derive(Serialize)]
pub(crate) struct Deleted {
    pub(crate) deleted: u64,
}
