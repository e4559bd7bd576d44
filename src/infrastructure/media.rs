//! Staging of media payloads into files the browser can upload.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::error::EngineError;
use crate::domain::model::MediaSource;

/// File extensions accepted when scanning a media directory.
pub const MEDIA_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "png", "jpg", "jpeg", "gif"];

/// A media payload resolved to an on-disk path for the upload input.
///
/// The `Temp` variant keeps its backing file alive until dropped, so the
/// staged media must outlive the upload step.
pub enum StagedMedia {
    Temp(NamedTempFile),
    File(PathBuf),
}

impl StagedMedia {
    pub fn path(&self) -> &Path {
        match self {
            StagedMedia::Temp(file) => file.path(),
            StagedMedia::File(path) => path.as_path(),
        }
    }
}

/// Resolve a media source to an uploadable file.
///
/// Byte payloads are written to a temp file; directory sources pick the
/// first recognized media file in lexicographic order.
pub fn stage(source: &MediaSource) -> Result<StagedMedia, EngineError> {
    match source {
        MediaSource::Bytes(bytes) => {
            if bytes.is_empty() {
                return Err(EngineError::Media("empty media payload".to_string()));
            }
            let mut file = tempfile::Builder::new()
                .prefix("autopost-")
                .suffix(".mp4")
                .tempfile()
                .map_err(|e| EngineError::Media(format!("staging temp file: {e}")))?;
            file.write_all(bytes)
                .map_err(|e| EngineError::Media(format!("writing media payload: {e}")))?;
            file.flush()
                .map_err(|e| EngineError::Media(format!("flushing media payload: {e}")))?;
            tracing::debug!(bytes = bytes.len(), path = ?file.path(), "Staged media payload");
            Ok(StagedMedia::Temp(file))
        }
        MediaSource::Directory(dir) => {
            let path = scan_directory(dir)?;
            tracing::debug!(path = ?path, "Selected media file");
            Ok(StagedMedia::File(path))
        }
    }
}

fn scan_directory(dir: &Path) -> Result<PathBuf, EngineError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| EngineError::Media(format!("reading media dir {}: {e}", dir.display())))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_media_extension(path))
        .collect();
    files.sort();

    files.into_iter().next().ok_or_else(|| {
        EngineError::Media(format!("no media file found in {}", dir.display()))
    })
}

fn has_media_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            MEDIA_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_staged_to_a_temp_file() {
        let staged = stage(&MediaSource::Bytes(vec![1, 2, 3, 4])).unwrap();
        let written = std::fs::read(staged.path()).unwrap();
        assert_eq!(written, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(stage(&MediaSource::Bytes(Vec::new())).is_err());
    }

    #[test]
    fn directory_scan_picks_first_recognized_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("a.mov"), b"x").unwrap();

        let staged = stage(&MediaSource::Directory(dir.path().to_path_buf())).unwrap();
        assert_eq!(staged.path().file_name().unwrap(), "a.mov");
    }

    #[test]
    fn directory_without_media_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), b"x").unwrap();
        assert!(stage(&MediaSource::Directory(dir.path().to_path_buf())).is_err());
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_media_extension(Path::new("clip.MP4")));
        assert!(!has_media_extension(Path::new("clip.doc")));
    }
}
