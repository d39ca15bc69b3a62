use axum::body::Bytes;
use axum::extract::Multipart;
use validator::Validate;

use crate::auth::csrf::{Csrf, CSRF_FIELD};
use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::forms::{shape_errors, FieldErrors};
use crate::uploads;

pub const IMAGES_ONLY: &str = "Images only: jpg, jpeg, png.";

/// A file part from the submission.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, Validate)]
pub struct PostForm {
    #[validate(length(max = 100, message = "Field cannot be longer than 100 characters."))]
    pub title: String,
    pub department: String,
    pub content: String,
    pub picture: Option<Upload>,
    pub csrf_token: String,
}

impl PostForm {
    /// Prefill from a stored post for the edit page.
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            department: post.department.clone(),
            content: post.content.clone(),
            ..Self::default()
        }
    }

    /// Read a `multipart/form-data` submission. Unknown parts are ignored and
    /// an empty file part counts as no file.
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = PostForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "picture" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?;
                    if !file_name.is_empty() && !data.is_empty() {
                        form.picture = Some(Upload { file_name, data });
                    }
                }
                "title" | "department" | "content" | CSRF_FIELD => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;
                    let value = value.trim().to_string();
                    match name.as_str() {
                        "title" => form.title = value,
                        "department" => form.department = value,
                        "content" => form.content = value,
                        _ => form.csrf_token = value,
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    pub fn check_fields(&self, csrf: &Csrf) -> FieldErrors {
        let mut errors = shape_errors(self);
        errors.require(&[
            ("title", self.title.as_str()),
            ("department", self.department.as_str()),
            ("content", self.content.as_str()),
        ]);
        if let Some(upload) = &self.picture {
            if !uploads::is_allowed_image(&upload.file_name) {
                errors.add("picture", IMAGES_ONLY);
            }
        }
        csrf.check(&self.csrf_token, &mut errors);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::csrf::test_csrf;
    use crate::forms::REQUIRED_MESSAGE;

    fn filled(csrf: &Csrf) -> PostForm {
        PostForm {
            title: "Linear Algebra Done Right".into(),
            department: "MATH".into(),
            content: "Axler, 3rd edition".into(),
            picture: None,
            csrf_token: csrf.token().to_string(),
        }
    }

    #[test]
    fn picture_is_optional() {
        let csrf = test_csrf();
        assert!(filled(&csrf).check_fields(&csrf).is_empty());
    }

    #[test]
    fn missing_csrf_token_is_reported() {
        let csrf = test_csrf();
        let mut form = filled(&csrf);
        form.csrf_token.clear();
        assert!(form.check_fields(&csrf).has(CSRF_FIELD));
    }

    #[test]
    fn missing_fields_are_required() {
        let errors = PostForm::default().check_fields(&test_csrf());
        assert_eq!(errors.get("title"), [REQUIRED_MESSAGE.to_string()]);
        assert_eq!(errors.get("department"), [REQUIRED_MESSAGE.to_string()]);
        assert_eq!(errors.get("content"), [REQUIRED_MESSAGE.to_string()]);
        assert!(!errors.has("picture"));
    }

    #[test]
    fn overly_long_title_is_rejected() {
        let csrf = test_csrf();
        let mut form = filled(&csrf);
        form.title = "x".repeat(101);
        assert!(form.check_fields(&csrf).has("title"));
    }

    #[test]
    fn non_image_upload_is_rejected() {
        let csrf = test_csrf();
        let mut form = filled(&csrf);
        form.picture = Some(Upload {
            file_name: "syllabus.pdf".into(),
            data: Bytes::from_static(b"%PDF"),
        });
        assert_eq!(
            form.check_fields(&csrf).get("picture"),
            [IMAGES_ONLY.to_string()]
        );

        form.picture = Some(Upload {
            file_name: "cover.PNG".into(),
            data: Bytes::from_static(b"png"),
        });
        assert!(form.check_fields(&csrf).is_empty());
    }
}
