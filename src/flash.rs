//! One-shot status messages carried across a redirect in a signed cookie.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::auth::cookies::{build_cookie, clear_cookie, get_cookie_value, CookieSigner};

pub const FLASH_COOKIE: &str = "bookswap_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Success,
    Info,
    Danger,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Success => "success",
            Category::Info => "info",
            Category::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: Category,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: Category::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            category: Category::Info,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            category: Category::Danger,
            message: message.into(),
        }
    }
}

fn encode(signer: &CookieSigner, flashes: &[Flash]) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(flashes)?;
    Ok(signer.sign(&hex::encode(json)))
}

/// Flashes pending in the request. Missing, unsigned or garbled cookies yield none.
pub fn read(signer: &CookieSigner, headers: &HeaderMap) -> Vec<Flash> {
    get_cookie_value(headers, FLASH_COOKIE)
        .and_then(|raw| signer.verify(raw))
        .and_then(|payload| hex::decode(payload).ok())
        .and_then(|json| serde_json::from_slice(&json).ok())
        .unwrap_or_default()
}

pub fn clear() -> String {
    clear_cookie(FLASH_COOKIE)
}

/// 303 to `location`, leaving `flash` for the next rendered page.
pub fn redirect(signer: &CookieSigner, location: &str, flash: Flash) -> Response {
    let mut headers = vec![(header::LOCATION, location.to_string())];
    match encode(signer, &[flash]) {
        Ok(value) => headers.push((
            header::SET_COOKIE,
            build_cookie(FLASH_COOKIE, &value, None),
        )),
        Err(e) => tracing::error!("Failed to encode flash message: {}", e),
    }
    (StatusCode::SEE_OTHER, axum::response::AppendHeaders(headers)).into_response()
}
