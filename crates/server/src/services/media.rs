//! Filesystem storage for uploaded images.
//!
//! Files live under the configured media root in one directory per kind
//! (`visit_photos/`, `item_photos/`) and are named by a random UUID, so a
//! stored path never contains client-supplied text. Stored paths are relative
//! to the root and are served read-only under [`MEDIA_URL_PREFIX`].

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use image::ImageFormat;
use thiserror::Error;
use uuid::Uuid;

/// URL prefix the media root is mounted at.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Errors from validating or storing media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("no file was submitted")]
    Empty,

    #[error("upload a valid image (JPEG, PNG, GIF or WebP)")]
    UnsupportedFormat,

    #[error("the image file is corrupt or truncated")]
    Corrupt,

    #[error("invalid media path: {0}")]
    InvalidPath(String),

    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where an image belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    VisitPhoto,
    ItemPhoto,
}

impl MediaKind {
    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::VisitPhoto => "visit_photos",
            Self::ItemPhoto => "item_photos",
        }
    }
}

/// Image bytes that passed format sniffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidImage {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ValidImage {
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Check that `bytes` hold a JPEG, PNG, GIF or WebP image with a readable header.
///
/// # Errors
///
/// Returns `MediaError::Empty` for zero bytes, `UnsupportedFormat` for any
/// other format and `Corrupt` when the header cannot be read.
pub fn sniff_image(bytes: Vec<u8>) -> Result<ValidImage, MediaError> {
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }

    let format = image::guess_format(&bytes).map_err(|_| MediaError::UnsupportedFormat)?;
    if !matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif | ImageFormat::WebP
    ) {
        return Err(MediaError::UnsupportedFormat);
    }

    image::ImageReader::with_format(Cursor::new(&bytes), format)
        .into_dimensions()
        .map_err(|_| MediaError::Corrupt)?;

    Ok(ValidImage { bytes, format })
}

fn extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        _ => "jpg",
    }
}

/// Public URL for a stored media path.
#[must_use]
pub fn media_url(path: &str) -> String {
    format!("{MEDIA_URL_PREFIX}/{}", path.trim_start_matches('/'))
}

/// Image storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an image and return its path relative to the root.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the directory or file cannot be written.
    pub async fn save(&self, kind: MediaKind, image: &ValidImage) -> Result<String, MediaError> {
        let dir = self.root.join(kind.directory());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension(image.format));
        tokio::fs::write(dir.join(&file_name), &image.bytes).await?;

        let relative = format!("{}/{file_name}", kind.directory());
        tracing::debug!(path = %relative, bytes = image.byte_len(), "stored image");
        Ok(relative)
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let path = Path::new(relative);
        let safe = !relative.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MediaError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }

    /// Delete a stored file. A file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::InvalidPath` for paths escaping the root and
    /// `MediaError::Io` for other failures.
    pub async fn remove(&self, relative: &str) -> Result<(), MediaError> {
        let path = self.resolve(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of several files. Failures are logged.
    pub async fn remove_all(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.remove(path).await {
                tracing::warn!(path = %path, error = %e, "failed to remove stored image");
            }
        }
    }
}
