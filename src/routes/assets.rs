use axum::extract::Path;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

/// Stylesheet and the placeholder cover, compiled into the binary.
#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

/// Strong validator derived from the embedded file's digest.
fn etag_of(digest: [u8; 32]) -> String {
    format!("\"{}\"", hex::encode(&digest[..8]))
}

fn matches_etag(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|candidate| candidate.trim() == etag))
        .unwrap_or(false)
}

/// GET /assets/{*path}
pub async fn serve(Path(path): Path<String>, headers: HeaderMap) -> Response {
    let Some(file) = Assets::get(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let etag = etag_of(file.metadata.sha256_hash());
    let mut response = if matches_etag(&headers, &etag) {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        ([(header::CONTENT_TYPE, mime.to_string())], file.data.into_owned()).into_response()
    };

    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_list_is_matched_per_entry() {
        let etag = etag_of([7; 32]);
        let mut headers = HeaderMap::new();
        assert!(!matches_etag(&headers, &etag));

        let list = format!("\"other\", {}", etag);
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_str(&list).unwrap());
        assert!(matches_etag(&headers, &etag));
    }

    #[test]
    fn placeholder_cover_is_embedded() {
        assert!(Assets::get("img/default.svg").is_some());
        assert!(Assets::get("css/style.css").is_some());
    }
}
