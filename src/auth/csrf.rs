//! Cross-site request forgery tokens.
//!
//! A token is the MAC of whatever ties the browser to this server: the
//! session token once logged in, otherwise a random seed kept in its own
//! signed cookie. Every form posts it back in a hidden `csrf_token` field.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use rand::Rng;

use crate::auth::cookies::{build_cookie, get_cookie_value, CookieSigner};
use crate::forms::FieldErrors;
use crate::state::AppState;

pub const CSRF_COOKIE: &str = "bookswap_csrf";
pub const CSRF_FIELD: &str = "csrf_token";
pub const CSRF_INVALID: &str = "The form has expired. Please submit it again.";

#[derive(Clone)]
pub struct Csrf {
    signer: CookieSigner,
    binding: String,
    token: String,
    issued: Option<String>,
}

impl Csrf {
    pub fn from_headers(signer: &CookieSigner, headers: &HeaderMap, session_cookie: &str) -> Self {
        let session = get_cookie_value(headers, session_cookie).and_then(|raw| signer.verify(raw));
        let seed = get_cookie_value(headers, CSRF_COOKIE).and_then(|raw| signer.verify(raw));

        let (binding, issued) = match (session, seed) {
            (Some(token), _) => (format!("csrf:session:{}", token), None),
            (None, Some(seed)) => (format!("csrf:seed:{}", seed), None),
            (None, None) => {
                let seed = generate_seed();
                let cookie = build_cookie(CSRF_COOKIE, &signer.sign(&seed), None);
                (format!("csrf:seed:{}", seed), Some(cookie))
            }
        };

        Self {
            token: signer.tag(&binding),
            signer: signer.clone(),
            binding,
            issued,
        }
    }

    /// Value for the hidden form field.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn verify(&self, submitted: &str) -> bool {
        self.signer.verify_tag(&self.binding, submitted.trim())
    }

    /// Record a field error unless `submitted` matches.
    pub fn check(&self, submitted: &str, errors: &mut FieldErrors) {
        if !self.verify(submitted) {
            tracing::warn!("Rejected form submission without a valid CSRF token");
            errors.add(CSRF_FIELD, CSRF_INVALID);
        }
    }

    /// `Set-Cookie` for a seed minted on this request.
    pub fn issued_cookie(&self) -> Option<&str> {
        self.issued.as_deref()
    }
}

impl std::fmt::Debug for Csrf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Csrf")
            .field("token", &self.token)
            .field("issued", &self.issued.is_some())
            .finish_non_exhaustive()
    }
}

impl FromRequestParts<AppState> for Csrf {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Csrf::from_headers(
            &state.signer,
            &parts.headers,
            &state.config.auth.cookie_name,
        ))
    }
}

fn generate_seed() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
pub(crate) fn test_csrf() -> Csrf {
    Csrf::from_headers(
        &CookieSigner::new("secret"),
        &HeaderMap::new(),
        "bookswap_session",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn with_cookie(pair: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(pair).unwrap());
        headers
    }

    #[test]
    fn first_visit_mints_a_seed_cookie() {
        let csrf = test_csrf();
        let cookie = csrf.issued_cookie().expect("seed cookie");
        assert!(cookie.starts_with("bookswap_csrf="));
        assert!(csrf.verify(csrf.token()));
    }

    #[test]
    fn seed_cookie_gives_a_stable_token() {
        let signer = CookieSigner::new("secret");
        let first = Csrf::from_headers(&signer, &HeaderMap::new(), "bookswap_session");
        let pair = first.issued_cookie().unwrap().split(';').next().unwrap();

        let second = Csrf::from_headers(&signer, &with_cookie(pair), "bookswap_session");
        assert!(second.issued_cookie().is_none());
        assert_eq!(second.token(), first.token());
        assert!(second.verify(first.token()));
    }

    #[test]
    fn token_is_bound_to_the_session() {
        let signer = CookieSigner::new("secret");
        let alice = with_cookie(&format!("bookswap_session={}", signer.sign("tok-a")));
        let bob = with_cookie(&format!("bookswap_session={}", signer.sign("tok-b")));

        let alice = Csrf::from_headers(&signer, &alice, "bookswap_session");
        let bob = Csrf::from_headers(&signer, &bob, "bookswap_session");
        assert!(alice.issued_cookie().is_none());
        assert!(!bob.verify(alice.token()));
        assert!(alice.verify(alice.token()));
    }

    #[test]
    fn missing_or_forged_token_is_a_field_error() {
        let csrf = test_csrf();
        let mut errors = FieldErrors::new();
        csrf.check("", &mut errors);
        assert_eq!(errors.get(CSRF_FIELD), [CSRF_INVALID.to_string()]);

        let forged = CookieSigner::new("attacker").tag("csrf:seed:whatever");
        let mut errors = FieldErrors::new();
        csrf.check(&forged, &mut errors);
        assert!(errors.has(CSRF_FIELD));

        let mut errors = FieldErrors::new();
        csrf.check(csrf.token(), &mut errors);
        assert!(errors.is_empty());
    }
}
