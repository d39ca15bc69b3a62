use askama::Template;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::csrf::Csrf;
use crate::auth::policy;
use crate::db::models::{NewPost, Post, PostChanges};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Layout, MaybeUser};
use crate::flash::{self, Flash};
use crate::forms::{FieldErrors, PostForm};
use crate::routes::home::Page;
use crate::state::AppState;
use crate::uploads;

#[derive(Template)]
#[template(path = "pages/account.html")]
pub struct AccountTemplate {
    pub layout: Layout,
    pub posts: Vec<Post>,
}

#[derive(Template)]
#[template(path = "pages/post.html")]
pub struct PostTemplate {
    pub layout: Layout,
    pub post: Post,
    pub author: String,
    pub can_edit: bool,
}

/// Shared by the create and update pages.
#[derive(Template)]
#[template(path = "pages/post_form.html")]
pub struct PostFormTemplate {
    pub layout: Layout,
    pub title: String,
    pub legend: String,
    pub action: String,
    pub form: PostForm,
    pub errors: FieldErrors,
}

/// Body of the delete button's form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteForm {
    pub csrf_token: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account", get(account))
        .route("/post/new", get(new_post_page).post(create_post))
        .route("/post/{id}", get(show_post))
        .route("/post/{id}/update", get(edit_post_page).post(update_post))
        .route("/post/{id}/delete", post(delete_post))
}

/// Non-numeric ids name no post.
fn parse_post_id(raw: &str) -> AppResult<i64> {
    raw.parse().map_err(|_| AppError::NotFound)
}

/// Load a post and check the principal may change it. Existence is checked first.
async fn load_owned(state: &AppState, raw_id: &str, user: &CurrentUser) -> AppResult<Post> {
    let post = state.posts.find_by_id(parse_post_id(raw_id)?).await?;
    if let Err(e) = policy::authorize_post(user, &post).require() {
        tracing::warn!(
            user_id = user.id,
            post_id = post.id,
            "Rejected change to a post owned by someone else"
        );
        return Err(e);
    }
    Ok(post)
}

async fn store_picture(state: &AppState, form: &PostForm) -> AppResult<Option<String>> {
    match &form.picture {
        Some(upload) => {
            let file_name = uploads::save_picture(
                &state.config.uploads_path(),
                &upload.file_name,
                &upload.data,
            )
            .await?;
            Ok(Some(file_name))
        }
        None => Ok(None),
    }
}

fn new_post_form(layout: Layout, form: PostForm, errors: FieldErrors) -> Response {
    let cookies = layout.page_cookies();
    Page::new(
        PostFormTemplate {
            layout,
            title: "Post New Book".to_string(),
            legend: "New Book post".to_string(),
            action: "/post/new".to_string(),
            form,
            errors,
        },
        cookies,
    )
    .into_response()
}

fn update_post_form(layout: Layout, id: i64, form: PostForm, errors: FieldErrors) -> Response {
    let cookies = layout.page_cookies();
    Page::new(
        PostFormTemplate {
            layout,
            title: "Update post".to_string(),
            legend: "Update post".to_string(),
            action: format!("/post/{}/update", id),
            form,
            errors,
        },
        cookies,
    )
    .into_response()
}

/// GET /account — the principal's own listings
async fn account(
    State(state): State<AppState>,
    user: CurrentUser,
    layout: Layout,
) -> AppResult<Response> {
    let posts = state.posts.list_by_owner(user.id).await?;
    let cookies = layout.page_cookies();
    Ok(Page::new(AccountTemplate { layout, posts }, cookies).into_response())
}

/// GET /post/new
async fn new_post_page(_user: CurrentUser, layout: Layout) -> Response {
    new_post_form(layout, PostForm::default(), FieldErrors::new())
}

/// POST /post/new
async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    layout: Layout,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = PostForm::from_multipart(multipart).await?;
    let errors = form.check_fields(layout.csrf());
    if !errors.is_empty() {
        return Ok(new_post_form(layout, form, errors));
    }

    let image_file = store_picture(&state, &form).await?;
    let post = state
        .posts
        .create(NewPost {
            title: form.title,
            department: form.department,
            content: form.content,
            image_file,
            owner_id: user.id,
        })
        .await?;

    tracing::info!(user_id = user.id, post_id = post.id, "Post created");
    Ok(flash::redirect(
        &state.signer,
        "/",
        Flash::success("Your post has been created."),
    ))
}

/// GET /post/{id}
async fn show_post(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    MaybeUser(user): MaybeUser,
    layout: Layout,
) -> AppResult<Response> {
    let post = state.posts.find_by_id(parse_post_id(&raw_id)?).await?;
    let author = state
        .users
        .find_by_id(post.owner_id)
        .await?
        .map(|owner| owner.username)
        .unwrap_or_default();
    let can_edit = user
        .map(|user| policy::authorize_post(&user, &post).is_allowed())
        .unwrap_or(false);

    let cookies = layout.page_cookies();
    Ok(Page::new(
        PostTemplate {
            layout,
            post,
            author,
            can_edit,
        },
        cookies,
    )
    .into_response())
}

/// GET /post/{id}/update — form prefilled from the stored post
async fn edit_post_page(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    user: CurrentUser,
    layout: Layout,
) -> AppResult<Response> {
    let post = load_owned(&state, &raw_id, &user).await?;
    Ok(update_post_form(
        layout,
        post.id,
        PostForm::from_post(&post),
        FieldErrors::new(),
    ))
}

/// POST /post/{id}/update — without a new file the picture stays as is
async fn update_post(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    user: CurrentUser,
    layout: Layout,
    multipart: Multipart,
) -> AppResult<Response> {
    let post = load_owned(&state, &raw_id, &user).await?;

    let form = PostForm::from_multipart(multipart).await?;
    let errors = form.check_fields(layout.csrf());
    if !errors.is_empty() {
        return Ok(update_post_form(layout, post.id, form, errors));
    }

    let image_file = store_picture(&state, &form).await?;
    let updated = state
        .posts
        .update(
            post.id,
            PostChanges {
                title: form.title,
                department: form.department,
                content: form.content,
                image_file,
            },
        )
        .await?;

    tracing::info!(user_id = user.id, post_id = updated.id, "Post updated");
    Ok(flash::redirect(
        &state.signer,
        &format!("/post/{}", updated.id),
        Flash::success("Your post has been updated."),
    ))
}

/// POST /post/{id}/delete — the button has no form to re-render, so a bad
/// token is refused outright
async fn delete_post(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    user: CurrentUser,
    csrf: Csrf,
    Form(form): Form<DeleteForm>,
) -> AppResult<Response> {
    let post = load_owned(&state, &raw_id, &user).await?;
    if !csrf.verify(&form.csrf_token) {
        tracing::warn!(
            user_id = user.id,
            post_id = post.id,
            "Rejected delete without a valid CSRF token"
        );
        return Err(AppError::Forbidden);
    }
    state.posts.delete(post.id).await?;

    tracing::info!(user_id = user.id, post_id = post.id, "Post deleted");
    Ok(flash::redirect(
        &state.signer,
        "/",
        Flash::success("Your post has been deleted."),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_id_is_not_found() {
        assert!(matches!(parse_post_id("abc"), Err(AppError::NotFound)));
        assert_eq!(parse_post_id("42").unwrap(), 42);
    }
}
