// Credential store - user records and password hashes
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use crate::db::models::{NewUser, User};
use crate::db::RepositoryError;
use crate::state::DbPool;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user. Fails with `DuplicateKey` when the username or email is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
}

pub struct SqliteCredentialStore {
    pool: DbPool,
}

impl SqliteCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn find_one(
        &self,
        column: &str,
        value: &dyn rusqlite::ToSql,
    ) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {} FROM users WHERE {} = ?1", User::COLUMNS, column);
        let user = conn
            .query_row(&sql, [value], User::from_row)
            .optional()?;
        Ok(user)
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO users (first_name, last_name, username, email, phone, password_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.first_name,
                user.last_name,
                user.username,
                user.email,
                user.phone,
                user.password_hash
            ],
        )
        .map_err(RepositoryError::from_insert)?;

        let id = conn.last_insert_rowid();
        Ok(User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        self.find_one("id", &id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.find_one("email", &email)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.find_one("username", &username)
    }
}
