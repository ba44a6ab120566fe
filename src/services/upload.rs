use std::path::{Path, PathBuf};
use tempfile::TempPath;

use crate::models::detection::VideoInfo;

const ACCEPTED_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-matroska",
    "video/3gpp",
    "video/avi",
    "video/mpeg",
];

const ACCEPTED_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "3gp", "avi", "mpg", "mpeg"];

/// Some devices send no usable MIME type, so the file extension is accepted as well.
pub fn is_accepted_video(content_type: Option<&str>, filename: Option<&str>) -> bool {
    if content_type.is_some_and(|ct| ACCEPTED_MIME_TYPES.contains(&ct.trim().to_lowercase().as_str())) {
        return true;
    }
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Reduce an uploaded file name to a safe stem and extension.
fn sanitize_name(original: Option<&str>) -> (String, String) {
    let path = Path::new(original.unwrap_or("video.mp4"));
    let stem: String = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("mp4")
        .to_string();
    let stem = if stem.is_empty() { "video".to_string() } else { stem };
    (stem, ext)
}

#[derive(Debug)]
enum Backing {
    /// Uploaded copy, deleted on release or drop.
    Temporary(TempPath),
    /// Caller's own file, never deleted.
    Kept(PathBuf),
}

/// A submitted video on local disk.
#[derive(Debug)]
pub struct VideoHandle {
    backing: Backing,
    filename: String,
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl VideoHandle {
    /// Take ownership of an existing file; it is deleted on release.
    pub fn adopt(path: PathBuf) -> Self {
        let filename = file_name_of(&path);
        Self {
            backing: Backing::Temporary(TempPath::from_path(path)),
            filename,
        }
    }

    /// Refer to a file that must survive the extraction.
    pub fn existing(path: PathBuf) -> Self {
        let filename = file_name_of(&path);
        Self {
            backing: Backing::Kept(path),
            filename,
        }
    }

    pub fn path(&self) -> &Path {
        match &self.backing {
            Backing::Temporary(path) => &**path,
            Backing::Kept(path) => path.as_path(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub async fn is_readable(&self) -> bool {
        tokio::fs::metadata(self.path())
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub async fn info(&self) -> VideoInfo {
        let size_bytes = tokio::fs::metadata(self.path())
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        VideoInfo {
            path: self.path().display().to_string(),
            filename: self.filename.clone(),
            size_bytes,
        }
    }

    /// Delete the file now, reporting failures instead of swallowing them on drop.
    pub fn release(self) -> std::io::Result<()> {
        match self.backing {
            Backing::Temporary(path) => match path.close() {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
            Backing::Kept(_) => Ok(()),
        }
    }
}

/// Directory that receives uploaded videos while they wait for extraction.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| UploadError::Io(dir.display().to_string(), e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create an empty temporary file for an upload and return it with its handle.
    pub fn create(&self, original_name: Option<&str>) -> Result<(VideoHandle, tokio::fs::File), UploadError> {
        let (stem, ext) = sanitize_name(original_name);
        let prefix = format!("{}_{}_", chrono::Utc::now().timestamp_millis(), stem);
        let suffix = format!(".{ext}");

        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.dir)
            .map_err(|e| UploadError::Io(self.dir.display().to_string(), e))?;
        let (file, path) = file.into_parts();
        let handle = VideoHandle {
            filename: file_name_of(&path),
            backing: Backing::Temporary(path),
        };

        Ok((handle, tokio::fs::File::from_std(file)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No video uploaded")]
    Missing,

    #[error("Unsupported file type")]
    UnsupportedType,

    #[error("Uploaded video is empty")]
    Empty,

    #[error("Malformed upload: {0}")]
    Malformed(String),

    #[error("Invalid form fields: {0}")]
    InvalidFields(String),

    #[error("Upload storage error at {0}: {1}")]
    Io(String, #[source] std::io::Error),
}
