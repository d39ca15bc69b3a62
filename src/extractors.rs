use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use rusqlite::{params, OptionalExtension};

use crate::auth::cookies::get_cookie_value;
use crate::auth::csrf::Csrf;
use crate::error::AppError;
use crate::flash::{self, Flash};
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Result of the session lookup, cached in request extensions so a handler
/// taking both `CurrentUser` and `Layout` hits the database once.
#[derive(Clone)]
struct ResolvedSession(Option<CurrentUser>);

async fn resolve_session(
    parts: &mut Parts,
    state: &AppState,
) -> Result<Option<CurrentUser>, AppError> {
    if let Some(ResolvedSession(user)) = parts.extensions.get::<ResolvedSession>() {
        return Ok(user.clone());
    }

    let token = get_cookie_value(&parts.headers, &state.config.auth.cookie_name)
        .and_then(|raw| state.signer.verify(raw));

    let user = match token {
        Some(token) => {
            let conn = state.db.get()?;
            conn.query_row(
                "SELECT u.id, u.username FROM sessions s \
                 JOIN users u ON u.id = s.user_id \
                 WHERE s.token = ?1 AND s.expires_at > datetime('now')",
                params![token],
                |row| {
                    Ok(CurrentUser {
                        id: row.get(0)?,
                        username: row.get(1)?,
                    })
                },
            )
            .optional()?
        }
        None => None,
    };

    parts.extensions.insert(ResolvedSession(user.clone()));
    Ok(user)
}

/// Redirect to the login page, remembering where the visitor was headed.
fn login_redirect(parts: &Parts, state: &AppState) -> Response {
    let next = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    let location = format!("/logIn?next={}", encoded);

    flash::redirect(
        &state.signer,
        &location,
        Flash::info("Please log in to access this page."),
    )
}

/// Extractor for protected handlers.
/// Anonymous requests are redirected to `/logIn?next=...`.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_session(parts, state).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(login_redirect(parts, state)),
            Err(e) => Err(e.into_response()),
        }
    }
}

/// Optional user extractor — `None` instead of a redirect when not authenticated.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve_session(parts, state).await?))
    }
}

/// Data every page shares: who is signed in, the pending flash messages and
/// the CSRF token its forms carry.
#[derive(Debug, Clone)]
pub struct Layout {
    pub username: Option<String>,
    pub flashes: Vec<Flash>,
    csrf: Csrf,
    from_cookie: bool,
}

impl Layout {
    pub fn signed_in(&self) -> bool {
        self.username.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("")
    }

    /// Show `flash` on this render instead of after a redirect.
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flashes.push(flash);
        self
    }

    pub fn csrf(&self) -> &Csrf {
        &self.csrf
    }

    pub fn csrf_token(&self) -> &str {
        self.csrf.token()
    }

    /// `Set-Cookie` values owed by the rendered page: consuming the flash
    /// cookie and handing out a fresh CSRF seed.
    pub fn page_cookies(&self) -> Vec<String> {
        let mut cookies = Vec::new();
        if self.from_cookie {
            cookies.push(flash::clear());
        }
        if let Some(seed) = self.csrf.issued_cookie() {
            cookies.push(seed.to_string());
        }
        cookies
    }
}

impl FromRequestParts<AppState> for Layout {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_session(parts, state).await?;
        let flashes = flash::read(&state.signer, &parts.headers);
        Ok(Layout {
            username: user.map(|u| u.username),
            from_cookie: get_cookie_value(&parts.headers, flash::FLASH_COOKIE).is_some(),
            csrf: Csrf::from_headers(
                &state.signer,
                &parts.headers,
                &state.config.auth.cookie_name,
            ),
            flashes,
        })
    }
}
