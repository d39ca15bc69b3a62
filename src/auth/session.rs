use rand::Rng;
use rusqlite::params;

use crate::db::RepositoryError;
use crate::state::DbPool;

/// Create a new session for a user. Returns the session token.
pub fn create_session(
    pool: &DbPool,
    user_id: i64,
    hours: u64,
) -> Result<String, RepositoryError> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(pool: &DbPool, token: &str) -> Result<(), RepositoryError> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Drop sessions past their expiry. Returns how many were removed.
pub fn purge_expired(pool: &DbPool) -> Result<usize, RepositoryError> {
    let conn = pool.get()?;
    let removed = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )?;
    Ok(removed)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_pool;

    fn seed_user(pool: &DbPool) -> i64 {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (first_name, last_name, username, email, phone, password_hash)
             VALUES ('A', 'B', 'alice', 'a@x.com', '1', 'x')",
            [],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn session_count(pool: &DbPool) -> i64 {
        let conn = pool.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
    }

    #[test]
    fn create_then_delete_session() {
        let (_tmp, pool) = test_pool();
        let user_id = seed_user(&pool);

        let token = create_session(&pool, user_id, 24).unwrap();
        assert_eq!(session_count(&pool), 1);

        delete_session(&pool, &token).unwrap();
        assert_eq!(session_count(&pool), 0);
    }

    #[test]
    fn purge_removes_only_expired_sessions() {
        let (_tmp, pool) = test_pool();
        let user_id = seed_user(&pool);
        create_session(&pool, user_id, 24).unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO sessions (id, user_id, token, expires_at)
                 VALUES ('old', ?1, 'stale', datetime('now', '-1 hours'))",
                params![user_id],
            )
            .unwrap();
        }

        assert_eq!(purge_expired(&pool).unwrap(), 1);
        assert_eq!(session_count(&pool), 1);
    }
}
