//! Built-in command handlers.
//!
//! Thin wrappers over filesystem and process calls. Expected failures (a
//! missing path, an empty parameter) come back as error outcomes with a
//! readable message; unexpected OS errors come back as [`HandlerError`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use tokio::fs;

use super::capture::ScreenCapture;
use super::registry::HandlerResult;
use super::CommandOutcome;
use crate::error::HandlerError;

/// Default screenshot file name.
pub const DEFAULT_SCREENSHOT_PATH: &str = "screen.jpg";

fn default_dir() -> String {
    ".".to_string()
}

fn default_save_path() -> String {
    DEFAULT_SCREENSHOT_PATH.to_string()
}

/// Parameters for `DIR`.
#[derive(Debug, Deserialize)]
pub struct DirParams {
    #[serde(default = "default_dir")]
    pub path: String,
}

/// Parameters for `DELETE`.
#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub file_path: String,
}

/// Parameters for `COPY`.
#[derive(Debug, Deserialize)]
pub struct CopyParams {
    pub source: String,
    pub destination: String,
}

/// Parameters for `EXECUTE`.
#[derive(Debug, Deserialize)]
pub struct ExecuteParams {
    pub program_path: String,
}

/// Parameters for `TAKE_SCREENSHOT`.
#[derive(Debug, Deserialize)]
pub struct ScreenshotParams {
    #[serde(default = "default_save_path")]
    pub save_path: String,
}

/// Parameters for `SEND_PHOTO`.
#[derive(Debug, Deserialize)]
pub struct PhotoParams {
    pub image_path: String,
}

async fn exists(path: impl AsRef<Path>) -> bool {
    fs::metadata(path).await.is_ok()
}

async fn is_dir(path: impl AsRef<Path>) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

/// `*.*`: a dot somewhere in the name, hidden entries excluded.
fn matches_listing(name: &str) -> bool {
    !name.starts_with('.') && name.contains('.')
}

/// List entries of a directory whose names match `*.*`.
pub async fn list_dir(params: DirParams) -> HandlerResult {
    tracing::debug!(path = %params.path, "DIR");

    if !exists(&params.path).await {
        return Ok(
            CommandOutcome::error(format!("Path does not exist: {}", params.path))
                .with_data("files", Value::Array(Vec::new())),
        );
    }

    let root = PathBuf::from(&params.path);
    let mut entries = fs::read_dir(&root)
        .await
        .map_err(|e| HandlerError::io(format!("Failed to read directory {}", params.path), e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| HandlerError::io(format!("Failed to read directory {}", params.path), e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if matches_listing(&name) {
            files.push(root.join(&name).to_string_lossy().into_owned());
        }
    }
    files.sort();

    let count = files.len();
    Ok(
        CommandOutcome::success(format!("Found {} files in {}", count, params.path))
            .with_data("files", files)
            .with_data("count", count),
    )
}

/// Delete a single file.
pub async fn delete_file(params: DeleteParams) -> HandlerResult {
    tracing::debug!(file = %params.file_path, "DELETE");

    if params.file_path.is_empty() {
        return Ok(CommandOutcome::error("No file path provided"));
    }
    if !exists(&params.file_path).await {
        return Ok(CommandOutcome::error(format!(
            "File does not exist: {}",
            params.file_path
        )));
    }

    fs::remove_file(&params.file_path)
        .await
        .map_err(|e| HandlerError::io(format!("Failed to delete {}", params.file_path), e))?;

    Ok(CommandOutcome::success(format!(
        "File deleted: {}",
        params.file_path
    )))
}

/// Copy a file. A directory destination receives the file under its own name.
pub async fn copy_file(params: CopyParams) -> HandlerResult {
    tracing::debug!(source = %params.source, destination = %params.destination, "COPY");

    if params.source.is_empty() || params.destination.is_empty() {
        return Ok(CommandOutcome::error("Missing source or destination"));
    }
    if !exists(&params.source).await {
        return Ok(CommandOutcome::error(format!(
            "Source file does not exist: {}",
            params.source
        )));
    }

    let mut target = PathBuf::from(&params.destination);
    if is_dir(&target).await {
        if let Some(name) = Path::new(&params.source).file_name() {
            target.push(name);
        }
    }

    fs::copy(&params.source, &target).await.map_err(|e| {
        HandlerError::io(
            format!("Failed to copy {} to {}", params.source, target.display()),
            e,
        )
    })?;

    Ok(CommandOutcome::success(format!(
        "File copied: {} -> {}",
        params.source, params.destination
    )))
}

/// Launch a program without waiting for it.
pub async fn execute_program(params: ExecuteParams) -> HandlerResult {
    tracing::debug!(program = %params.program_path, "EXECUTE");

    if params.program_path.is_empty() {
        return Ok(CommandOutcome::error("No program path provided"));
    }

    let child = tokio::process::Command::new(&params.program_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| HandlerError::Launch {
            program: params.program_path.clone(),
            source,
        })?;
    tracing::info!(program = %params.program_path, pid = ?child.id(), "program launched");

    Ok(CommandOutcome::success(format!(
        "Program executed: {}",
        params.program_path
    )))
}

/// Capture the screen into `save_path`.
pub async fn take_screenshot(
    capture: Arc<dyn ScreenCapture>,
    params: ScreenshotParams,
) -> HandlerResult {
    tracing::debug!(path = %params.save_path, "TAKE_SCREENSHOT");

    let path = PathBuf::from(&params.save_path);
    tokio::task::spawn_blocking(move || capture.capture_to(&path))
        .await
        .map_err(|_| HandlerError::Panicked("TAKE_SCREENSHOT".to_string()))??;

    Ok(
        CommandOutcome::success(format!("Screenshot saved: {}", params.save_path))
            .with_data("path", params.save_path),
    )
}

/// Read an image file and return it as the binary payload.
pub async fn send_photo(params: PhotoParams) -> HandlerResult {
    tracing::debug!(path = %params.image_path, "SEND_PHOTO");

    let bytes = fs::read(&params.image_path)
        .await
        .map_err(|e| HandlerError::io(format!("Failed to read {}", params.image_path), e))?;
    tracing::debug!(size = bytes.len(), "photo loaded");

    Ok(
        CommandOutcome::success(format!("Photo ready to send: {}", params.image_path))
            .with_binary(Bytes::from(bytes)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Status;
    use serde_json::json;
    use tempfile::tempdir;

    struct FakeCapture(&'static [u8]);

    impl ScreenCapture for FakeCapture {
        fn capture_to(&self, path: &Path) -> Result<(), HandlerError> {
            std::fs::write(path, self.0).map_err(|e| HandlerError::io("write", e))
        }
    }

    #[test]
    fn test_listing_pattern() {
        assert!(matches_listing("a.txt"));
        assert!(matches_listing("archive.tar.gz"));
        assert!(!matches_listing("Makefile"));
        assert!(!matches_listing(".hidden"));
        assert!(!matches_listing(".config.toml"));
    }

    #[tokio::test]
    async fn test_list_dir() {
        let dir = tempdir().unwrap();
        for name in ["b.txt", "a.md", "README", ".env"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let path = dir.path().to_string_lossy().into_owned();

        let outcome = list_dir(DirParams { path: path.clone() }).await.unwrap();

        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.message, format!("Found 2 files in {}", path));
        assert_eq!(outcome.data["count"], json!(2));
        assert_eq!(
            outcome.data["files"],
            json!([
                dir.path().join("a.md").to_string_lossy(),
                dir.path().join("b.txt").to_string_lossy(),
            ])
        );
    }

    #[tokio::test]
    async fn test_list_missing_dir() {
        let outcome = list_dir(DirParams {
            path: "/definitely/not/here".into(),
        })
        .await
        .unwrap();

        assert_eq!(outcome.status, Status::Error);
        assert_eq!(outcome.message, "Path does not exist: /definitely/not/here");
        assert_eq!(outcome.data["files"], json!([]));
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("gone.txt");
        std::fs::write(&file, b"bye").unwrap();
        let file_path = file.to_string_lossy().into_owned();

        let outcome = delete_file(DeleteParams {
            file_path: file_path.clone(),
        })
        .await
        .unwrap();
        assert_eq!(outcome.status, Status::Success);
        assert!(!file.exists());

        let outcome = delete_file(DeleteParams { file_path }).await.unwrap();
        assert_eq!(outcome.status, Status::Error);
        assert!(outcome.message.starts_with("File does not exist"));
    }

    #[tokio::test]
    async fn test_delete_empty_path() {
        let outcome = delete_file(DeleteParams {
            file_path: String::new(),
        })
        .await
        .unwrap();
        assert_eq!(outcome.message, "No file path provided");
    }

    #[tokio::test]
    async fn test_copy_to_file_and_directory() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src.txt");
        std::fs::write(&source, b"payload").unwrap();
        let target_dir = dir.path().join("out");
        std::fs::create_dir(&target_dir).unwrap();

        let outcome = copy_file(CopyParams {
            source: source.to_string_lossy().into_owned(),
            destination: dir.path().join("dst.txt").to_string_lossy().into_owned(),
        })
        .await
        .unwrap();
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(std::fs::read(dir.path().join("dst.txt")).unwrap(), b"payload");

        let outcome = copy_file(CopyParams {
            source: source.to_string_lossy().into_owned(),
            destination: target_dir.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(std::fs::read(target_dir.join("src.txt")).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let outcome = copy_file(CopyParams {
            source: "/no/such/source".into(),
            destination: "/tmp".into(),
        })
        .await
        .unwrap();
        assert_eq!(outcome.status, Status::Error);
        assert_eq!(outcome.message, "Source file does not exist: /no/such/source");
    }

    #[tokio::test]
    async fn test_execute_missing_program() {
        let err = execute_program(ExecuteParams {
            program_path: "/no/such/program-cmdwire".into(),
        })
        .await
        .unwrap_err();
        assert!(matches!(err, HandlerError::Launch { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_launches() {
        let outcome = execute_program(ExecuteParams {
            program_path: "true".into(),
        })
        .await
        .unwrap();
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.message, "Program executed: true");
    }

    #[tokio::test]
    async fn test_send_photo() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("screen.jpg");
        std::fs::write(&image, [0xFF, 0xD8, 0xFF, 0x00, 0x3C]).unwrap();

        let outcome = send_photo(PhotoParams {
            image_path: image.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();

        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.binary.as_deref(), Some(&[0xFF, 0xD8, 0xFF, 0x00, 0x3C][..]));
    }

    #[tokio::test]
    async fn test_send_photo_missing() {
        let err = send_photo(PhotoParams {
            image_path: "/no/such/image.jpg".into(),
        })
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to read /no/such/image.jpg"));
    }

    #[tokio::test]
    async fn test_take_screenshot_with_backend() {
        let dir = tempdir().unwrap();
        let save_path = dir.path().join("shot.jpg").to_string_lossy().into_owned();

        let outcome = take_screenshot(
            Arc::new(FakeCapture(b"image")),
            ScreenshotParams {
                save_path: save_path.clone(),
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.data["path"], json!(save_path));
        assert_eq!(std::fs::read(&save_path).unwrap(), b"image");
    }

    #[tokio::test]
    async fn test_take_screenshot_unsupported() {
        let err = take_screenshot(
            Arc::new(super::super::capture::NoScreenCapture),
            ScreenshotParams {
                save_path: "screen.jpg".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HandlerError::Unsupported(_)));
    }
}
