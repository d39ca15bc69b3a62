use std::path::Path;

use rand::Rng;

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Lower-cased extension of a client-supplied filename.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_allowed_image(file_name: &str) -> bool {
    extension_of(file_name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// 16 random hex characters plus the original extension. The client's
/// name is never used as a path component.
pub fn random_file_name(original: &str) -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    match extension_of(original) {
        Some(ext) => format!("{}.{}", hex::encode(bytes), ext),
        None => hex::encode(bytes),
    }
}

/// Write an uploaded picture into `dir` and return the stored filename.
pub async fn save_picture(dir: &Path, original: &str, data: &[u8]) -> std::io::Result<String> {
    tokio::fs::create_dir_all(dir).await?;
    let file_name = random_file_name(original);
    tokio::fs::write(dir.join(&file_name), data).await?;
    tracing::debug!("Stored upload {} as {}", original, file_name);
    Ok(file_name)
}
