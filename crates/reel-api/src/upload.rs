//! Multipart uploads into the footage library.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use axum::extract::Multipart;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{ApiError, ApiResult};

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9.]").expect("valid regex"));

/// Replace every character other than ASCII letters, digits and `.` with `_`.
///
/// Directory components are dropped; a name made only of dots (or nothing)
/// is replaced by a generated one.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let safe = UNSAFE_FILENAME_CHARS.replace_all(base, "_").to_string();
    if safe.chars().all(|c| c == '.') {
        return format!("upload_{}", uuid::Uuid::new_v4().simple());
    }
    safe
}

#[derive(Debug, Clone)]
pub struct SavedUpload {
    pub filename: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Stream the first file field named `field_name` into `dir`.
///
/// The file is written under a `.part` name and renamed once complete, so
/// the library never lists a half-written upload.
pub async fn save_file_field(
    multipart: &mut Multipart,
    field_name: &str,
    dir: &Path,
) -> ApiResult<SavedUpload> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let original = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request(format!("{field_name} must be a file")))?;
        let filename = sanitize_filename(&original);

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&filename);
        let staged = dir.join(format!("{filename}.part"));

        let mut file = tokio::fs::File::create(&staged).await?;
        let mut bytes = 0u64;
        let written: ApiResult<()> = async {
            while let Some(chunk) = field.chunk().await? {
                bytes += chunk.len() as u64;
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;
        drop(file);
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e);
        }
        tokio::fs::rename(&staged, &path).await?;

        info!(filename = %filename, bytes, "Upload stored");
        return Ok(SavedUpload {
            filename,
            path,
            bytes,
        });
    }
    Err(ApiError::bad_request(format!("no {field_name} provided")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my voice (final)!.mp3"), "my_voice__final__.mp3");
        assert_eq!(sanitize_filename("clip-01.MOV"), "clip_01.MOV");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\take 2.mp4"), "take_2.mp4");
    }

    #[test]
    fn test_sanitize_rejects_dot_names() {
        for name in ["..", ".", ""] {
            let safe = sanitize_filename(name);
            assert!(safe.starts_with("upload_"), "{name:?} -> {safe}");
        }
    }
}
