use crate::session::TinyToken;
use crate::store::KvStore;

#[derive(Clone, Debug)]
pub(crate) struct AppState<S> {
    pub(crate) tinytoken: TinyToken<S>,
}

impl<S: KvStore> AppState<S> {
    pub(crate) fn new(tinytoken: TinyToken<S>) -> Self {
        Self { tinytoken }
    }
}
