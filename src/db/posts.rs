// Post repository - persistence only, callers enforce ownership
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::models::{NewPost, Post, PostChanges, PostSummary, DEFAULT_IMAGE};
use crate::db::RepositoryError;
use crate::state::DbPool;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: NewPost) -> Result<Post, RepositoryError>;

    /// Fails with `NotFound` when no post has this id.
    async fn find_by_id(&self, id: i64) -> Result<Post, RepositoryError>;

    /// Every post with its author's username, in insertion order.
    async fn list_all(&self) -> Result<Vec<PostSummary>, RepositoryError>;

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Post>, RepositoryError>;

    /// Apply `changes` and return the stored result. A `None` image keeps the current file.
    async fn update(&self, id: i64, changes: PostChanges) -> Result<Post, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}

pub struct SqlitePostRepository {
    pool: DbPool,
}

impl SqlitePostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn load(conn: &rusqlite::Connection, id: i64) -> Result<Post, RepositoryError> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?1", Post::COLUMNS);
        conn.query_row(&sql, params![id], Post::from_row)
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound(format!("post {}", id)))
    }
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn create(&self, post: NewPost) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;
        let date_posted = Utc::now();
        let image_file = post
            .image_file
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string());

        conn.execute(
            "INSERT INTO posts (title, department, content, image_file, date_posted, owner_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                post.title,
                post.department,
                post.content,
                image_file,
                date_posted,
                post.owner_id
            ],
        )?;

        Ok(Post {
            id: conn.last_insert_rowid(),
            title: post.title,
            department: post.department,
            content: post.content,
            image_file,
            date_posted,
            owner_id: post.owner_id,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;
        Self::load(&conn, id)
    }

    async fn list_all(&self) -> Result<Vec<PostSummary>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.title, p.department, p.content, p.image_file, p.date_posted,
                    p.owner_id, u.username
             FROM posts p JOIN users u ON u.id = p.owner_id
             ORDER BY p.id",
        )?;
        let posts = stmt
            .query_map([], PostSummary::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM posts WHERE owner_id = ?1 ORDER BY id",
            Post::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params![owner_id], Post::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE posts SET title = ?1, department = ?2, content = ?3,
                    image_file = COALESCE(?4, image_file)
             WHERE id = ?5",
            params![
                changes.title,
                changes.department,
                changes.content,
                changes.image_file,
                id
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound(format!("post {}", id)));
        }

        Self::load(&conn, id)
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::NotFound(format!("post {}", id)));
        }
        Ok(())
    }
}
