use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db::models::PostSummary;
use crate::error::AppResult;
use crate::extractors::Layout;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub layout: Layout,
    pub posts: Vec<PostSummary>,
}

#[derive(Template)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub layout: Layout,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// A full page plus the cookies its [`Layout`] asks for.
pub struct Page<T: Template> {
    template: T,
    cookies: Vec<String>,
}

impl<T: Template> Page<T> {
    pub fn new(template: T, cookies: Vec<String>) -> Self {
        Self { template, cookies }
    }
}

impl<T: Template> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let mut response = Html(self.template).into_response();
        for cookie in self.cookies {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

/// GET / — every listing
pub async fn index(State(state): State<AppState>, layout: Layout) -> AppResult<Response> {
    let posts = state.posts.list_all().await?;
    let cookies = layout.page_cookies();
    Ok(Page::new(IndexTemplate { layout, posts }, cookies).into_response())
}

/// GET /about
pub async fn about(layout: Layout) -> Response {
    let cookies = layout.page_cookies();
    Page::new(AboutTemplate { layout }, cookies).into_response()
}
