use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::cookies::CookieSigner;
use crate::config::Config;
use crate::db::{CredentialStore, PostRepository, SqliteCredentialStore, SqlitePostRepository};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Everything a handler needs, handed to each request explicitly.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub users: Arc<dyn CredentialStore>,
    pub posts: Arc<dyn PostRepository>,
    pub signer: CookieSigner,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let signer = CookieSigner::new(config.secret_key());
        Self {
            users: Arc::new(SqliteCredentialStore::new(db.clone())),
            posts: Arc::new(SqlitePostRepository::new(db.clone())),
            db,
            config,
            signer,
        }
    }
}
