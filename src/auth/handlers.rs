use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::cookies::{build_cookie, clear_cookie, get_cookie_value};
use crate::auth::{password, session};
use crate::db::models::NewUser;
use crate::db::RepositoryError;
use crate::error::AppResult;
use crate::extractors::Layout;
use crate::flash::{self, Flash};
use crate::forms::sign_up::{EMAIL_TAKEN, USERNAME_TAKEN};
use crate::forms::{FieldErrors, LogInForm, SignUpForm};
use crate::routes::home::Page;
use crate::state::AppState;

pub const LOGIN_FAILED: &str = "Login failed. Please check email and password.";

// -- Templates --

#[derive(Template)]
#[template(path = "pages/sign_up.html")]
pub struct SignUpTemplate {
    pub layout: Layout,
    pub form: SignUpForm,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "pages/log_in.html")]
pub struct LogInTemplate {
    pub layout: Layout,
    pub form: LogInForm,
    pub errors: FieldErrors,
    pub action: String,
}

// -- Request types --

#[derive(Deserialize, Default)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Only same-site paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') =>
        {
            path
        }
        _ => "/",
    }
}

/// Form action that carries `next` through the POST.
fn log_in_action(next: Option<&str>) -> String {
    match next.filter(|n| !n.is_empty()) {
        Some(next) => {
            let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
            format!("/logIn?next={}", encoded)
        }
        None => "/logIn".to_string(),
    }
}

// -- Sign up handlers --

/// GET /signUp
pub async fn sign_up_page(layout: Layout) -> Response {
    if layout.signed_in() {
        return Redirect::to("/").into_response();
    }

    let cookies = layout.page_cookies();
    Page::new(
        SignUpTemplate {
            layout,
            form: SignUpForm::default(),
            errors: FieldErrors::new(),
        },
        cookies,
    )
    .into_response()
}

/// POST /signUp — create the account or re-render with field errors
pub async fn sign_up(
    State(state): State<AppState>,
    layout: Layout,
    Form(form): Form<SignUpForm>,
) -> AppResult<Response> {
    if layout.signed_in() {
        return Ok(Redirect::to("/").into_response());
    }

    let form = form.normalized();
    let mut errors = form
        .validate_with(state.users.as_ref(), layout.csrf())
        .await?;

    if errors.is_empty() {
        let password_hash =
            password::hash_password(&form.password, state.config.auth.bcrypt_cost)?;
        let created = state
            .users
            .create(NewUser {
                first_name: form.first_name.clone(),
                last_name: form.last_name.clone(),
                username: form.username.clone(),
                email: form.email.clone(),
                phone: form.phone.clone(),
                password_hash,
            })
            .await;

        match created {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Account created for {}", user.username);
                return Ok(flash::redirect(
                    &state.signer,
                    "/logIn",
                    Flash::success("Your account has been created successfully."),
                ));
            }
            // Lost a race with a concurrent sign-up
            Err(RepositoryError::DuplicateKey(column)) if column == "username" => {
                errors.add("username", USERNAME_TAKEN);
            }
            Err(RepositoryError::DuplicateKey(column)) if column == "email" => {
                errors.add("email", EMAIL_TAKEN);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let cookies = layout.page_cookies();
    Ok(Page::new(
        SignUpTemplate {
            layout,
            form,
            errors,
        },
        cookies,
    )
    .into_response())
}

// -- Login handlers --

/// GET /logIn
pub async fn log_in_page(layout: Layout, Query(query): Query<NextQuery>) -> Response {
    if layout.signed_in() {
        return Redirect::to("/").into_response();
    }

    let cookies = layout.page_cookies();
    Page::new(
        LogInTemplate {
            layout,
            form: LogInForm::default(),
            errors: FieldErrors::new(),
            action: log_in_action(query.next.as_deref()),
        },
        cookies,
    )
    .into_response()
}

/// POST /logIn — verify credentials and start a session
pub async fn log_in(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<NextQuery>,
    Form(form): Form<LogInForm>,
) -> AppResult<Response> {
    if layout.signed_in() {
        return Ok(Redirect::to("/").into_response());
    }

    let form = form.normalized();
    let errors = form.check_fields(layout.csrf());
    let mut layout = layout;

    if errors.is_empty() {
        let user = state
            .users
            .find_by_email(&form.email)
            .await?
            .filter(|user| password::verify_password(&form.password, &user.password_hash));

        match user {
            Some(user) => {
                let remember = form.remember_me();
                let auth = &state.config.auth;
                let hours = if remember {
                    auth.remember_hours
                } else {
                    auth.session_hours
                };

                let token = session::create_session(&state.db, user.id, hours)?;
                let cookie = build_cookie(
                    &auth.cookie_name,
                    &state.signer.sign(&token),
                    remember.then_some(hours * 3600),
                );

                tracing::info!(user_id = user.id, remember, "User logged in");

                return Ok((
                    StatusCode::SEE_OTHER,
                    [
                        (header::LOCATION, safe_next(query.next.as_deref()).to_string()),
                        (header::SET_COOKIE, cookie),
                    ],
                )
                    .into_response());
            }
            None => {
                tracing::info!("Failed login attempt");
                layout = layout.with_flash(Flash::danger(LOGIN_FAILED));
            }
        }
    }

    let cookies = layout.page_cookies();
    let form = LogInForm {
        password: String::new(),
        ..form
    };
    Ok(Page::new(
        LogInTemplate {
            layout,
            form,
            errors,
            action: log_in_action(query.next.as_deref()),
        },
        cookies,
    )
    .into_response())
}

// -- Logout handler --

/// GET /logOut — delete the session and return home
pub async fn log_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let cookie_name = &state.config.auth.cookie_name;

    let token =
        get_cookie_value(&headers, cookie_name).and_then(|raw| state.signer.verify(raw));
    if let Some(token) = token {
        match session::delete_session(&state.db, token) {
            Ok(()) => tracing::info!("User logged out"),
            Err(e) => tracing::warn!("Failed to delete session: {}", e),
        }
    }

    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, clear_cookie(cookie_name)),
        ],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_next_accepts_local_paths() {
        assert_eq!(safe_next(Some("/account")), "/account");
        assert_eq!(safe_next(Some("/post/3/update?x=1")), "/post/3/update?x=1");
    }

    #[test]
    fn safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next(None), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
    }

    #[test]
    fn log_in_action_encodes_next() {
        assert_eq!(log_in_action(None), "/logIn");
        assert_eq!(log_in_action(Some("/post/new")), "/logIn?next=%2Fpost%2Fnew");
    }
}
