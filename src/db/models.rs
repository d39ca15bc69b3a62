use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

/// Filename recorded on posts created without a picture.
pub const DEFAULT_IMAGE: &str = "default.svg";

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl User {
    pub const COLUMNS: &'static str =
        "id, first_name, last_name, username, email, phone, password_hash";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            username: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            password_hash: row.get(6)?,
        })
    }
}

/// A user about to be inserted. `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub department: String,
    pub content: String,
    pub image_file: String,
    pub date_posted: DateTime<Utc>,
    pub owner_id: i64,
}

impl Post {
    pub const COLUMNS: &'static str =
        "id, title, department, content, image_file, date_posted, owner_id";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            department: row.get(2)?,
            content: row.get(3)?,
            image_file: row.get(4)?,
            date_posted: row.get(5)?,
            owner_id: row.get(6)?,
        })
    }

    /// Public URL for the post's picture. The placeholder ships with the
    /// embedded assets; uploads live under `/static`.
    pub fn image_url(&self) -> String {
        if self.image_file == DEFAULT_IMAGE {
            format!("/assets/img/{}", DEFAULT_IMAGE)
        } else {
            format!("/static/{}", self.image_file)
        }
    }

    pub fn date_label(&self) -> String {
        self.date_posted.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub department: String,
    pub content: String,
    pub image_file: Option<String>,
    pub owner_id: i64,
}

/// Fields an owner may change. `image_file: None` keeps the current picture.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub department: String,
    pub content: String,
    pub image_file: Option<String>,
}

/// A post joined with its owner's username, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub post: Post,
    pub author: String,
}

impl PostSummary {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            post: Post::from_row(row)?,
            author: row.get(7)?,
        })
    }
}
