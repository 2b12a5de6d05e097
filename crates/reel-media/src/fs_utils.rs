//! Filesystem helpers for footage files.

use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::error::{MediaError, MediaResult};

const HASH_CHUNK_BYTES: usize = 1024 * 1024;

/// Move a file, falling back to copy-and-delete across filesystems.
///
/// The copy goes through a `.tmp` sibling so the destination never holds a
/// partial file.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename, copying instead: {} -> {}",
                src.display(),
                dst.display()
            );
            let staged = dst.with_extension("tmp");
            fs::copy(src, &staged).await?;
            if let Err(e) = fs::rename(&staged, dst).await {
                let _ = fs::remove_file(&staged).await;
                return Err(e.into());
            }
            if let Err(e) = fs::remove_file(src).await {
                tracing::warn!("Could not remove {} after copy: {}", src.display(), e);
            }
            Ok(())
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// EXDEV on Linux and macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

/// Hex-encoded SHA-256 of a file's contents.
pub async fn hash_file(path: impl AsRef<Path>) -> MediaResult<String> {
    let path = path.as_ref();
    let mut file = fs::File::open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MediaError::FileNotFound(path.to_path_buf()),
        _ => MediaError::Io(e),
    })?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_BYTES];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Wait until a freshly written file is no longer being written.
///
/// Polls every `interval` until the file opens for writing and its size is
/// unchanged between two consecutive polls, giving up after `max_wait`.
pub async fn wait_for_release(
    path: impl AsRef<Path>,
    interval: Duration,
    max_wait: Duration,
) -> MediaResult<()> {
    let path = path.as_ref();
    let started = tokio::time::Instant::now();
    let mut last_len: Option<u64> = None;

    loop {
        let len = match fs::metadata(path).await {
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if let Some(len) = len {
            let writable = fs::OpenOptions::new().append(true).open(path).await.is_ok();
            if writable && last_len == Some(len) {
                return Ok(());
            }
            last_len = Some(len);
        }

        if started.elapsed() >= max_wait {
            if len.is_none() {
                return Err(MediaError::FileNotFound(path.to_path_buf()));
            }
            return Err(MediaError::HandleNotReleased {
                path: path.to_path_buf(),
                waited_ms: started.elapsed().as_millis() as u64,
            });
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_file_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("render.mp4");
        let dst = dir.path().join("renders").join("render.mp4");
        fs::write(&src, b"frames").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"frames");
    }

    #[tokio::test]
    async fn test_move_file_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.mp4");
        let dst = dir.path().join("b.mp4");
        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();

        move_file(&src, &dst).await.unwrap();
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "new");
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }

    #[tokio::test]
    async fn test_hash_file_matches_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.bin");
        fs::write(&path, b"abc").await.unwrap();

        let digest = hash_file(&path).await.unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_wait_for_release_settled_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mp4");
        fs::write(&path, b"done").await.unwrap();

        wait_for_release(&path, Duration::from_millis(5), Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_release_missing_file_times_out() {
        let dir = TempDir::new().unwrap();
        let err = wait_for_release(
            dir.path().join("never.mp4"),
            Duration::from_millis(5),
            Duration::from_millis(30),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
