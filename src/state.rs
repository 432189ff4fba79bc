use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::TokenService;

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(db: SqlitePool, tokens: TokenService) -> Self {
        Self {
            db,
            tokens: Arc::new(tokens),
        }
    }
}
