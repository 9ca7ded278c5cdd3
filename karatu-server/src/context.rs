use std::sync::Arc;

use axum::extract::FromRef;
use karatu_collab::{Karatu, PgDatabase};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub karatu: Arc<Karatu<PgDatabase>>,
}
