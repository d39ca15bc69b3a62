use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        self == Access::Allow
    }

    /// `Deny` becomes a 403.
    pub fn require(self) -> AppResult<()> {
        match self {
            Access::Allow => Ok(()),
            Access::Deny => Err(AppError::Forbidden),
        }
    }
}

/// Only a post's owner may change or remove it.
pub fn authorize_post(principal: &CurrentUser, post: &Post) -> Access {
    if principal.id == post.owner_id {
        Access::Allow
    } else {
        Access::Deny
    }
}
