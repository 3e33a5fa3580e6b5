use std::sync::Arc;

use sqlx::PgPool;

use crate::config;
use crate::email::EmailSender;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub env: config::Config,
    pub email: Arc<dyn EmailSender>,
}

impl AppState {
    pub fn new(db: PgPool, env: config::Config, email: Arc<dyn EmailSender>) -> Self {
        Self { db, env, email }
    }
}
