//! Catalog image storage.
//!
//! Uploaded images are written to a flat directory; only the generated
//! filename is persisted on the catalog item. Filenames are prefixed with
//! the upload time in unix millis so client-chosen names cannot collide.

use std::path::Path;

use chrono::Utc;

/// Persist an uploaded image and return the stored filename.
///
/// # Errors
///
/// Returns `std::io::Error` if the file cannot be written.
pub async fn store_image(
    upload_dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> std::io::Result<String> {
    let filename = format!(
        "{}{}",
        Utc::now().timestamp_millis(),
        sanitize_filename(original_name)
    );
    tokio::fs::write(upload_dir.join(&filename), bytes).await?;
    Ok(filename)
}

/// Best-effort removal of a stored image, used when the catalog insert
/// fails after the file was already written.
pub async fn remove_image(upload_dir: &Path, filename: &str) {
    if let Err(e) = tokio::fs::remove_file(upload_dir.join(filename)).await {
        tracing::warn!(filename, error = %e, "failed to remove stored image");
    }
}

/// Strip anything that could traverse out of the upload directory.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_then_remove_leaves_no_file() {
        let dir = std::env::temp_dir().join(format!(
            "bistro-uploads-{}",
            Utc::now().timestamp_nanos_opt().unwrap()
        ));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let stored = store_image(&dir, "pic.png", b"bytes").await.unwrap();
        assert!(dir.join(&stored).exists());

        remove_image(&dir, &stored).await;
        assert!(!dir.join(&stored).exists());

        tokio::fs::remove_dir(&dir).await.unwrap();
    }

    #[test]
    fn test_sanitize_keeps_plain_names() {
        assert_eq!(sanitize_filename("food_5.png"), "food_5.png");
    }

    #[test]
    fn test_sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_filename("a/b\\c.png"), "abc.png");
    }
}
