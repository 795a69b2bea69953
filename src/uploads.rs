// ABOUTME: Uploaded image handling: format validation, temp-file staging and release
// ABOUTME: Provides PendingImage, a single-use handle freed by value, and the ImageRef kept on turns
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Uploads
//!
//! An upload is validated (extension and magic bytes), written to a named temp
//! file, and handed to the orchestrator as a [`PendingImage`]. The handle is
//! analyzed at most once and then released with [`PendingImage::release`],
//! which takes `self` so a second release does not compile.
//!
//! The [`ImageRef`] recorded on a turn is plain metadata and outlives the
//! temp file.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use billease_core::constants::uploads::{ACCEPTED_EXTENSIONS, TEMP_FILE_PREFIX};
use serde::{Deserialize, Serialize};
use tempfile::{Builder, NamedTempFile};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::llm::ImageAttachment;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Image formats the uploader accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG (`.jpg`, `.jpeg`)
    Jpeg,
    /// PNG (`.png`)
    Png,
}

impl ImageFormat {
    /// Detect the format from the leading bytes of a file
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PNG_MAGIC) {
            Some(Self::Png)
        } else if bytes.starts_with(JPEG_MAGIC) {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    /// MIME type sent to the vision model
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Canonical file extension, used for the temp file suffix
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.mime_type())
    }
}

/// Check a file name against the accepted extensions (case-insensitive)
#[must_use]
pub fn has_accepted_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
}

/// Opaque reference to an uploaded image, stored on the user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Upload identifier
    pub id: Uuid,
    /// File name as given by the user
    pub file_name: String,
    /// Detected MIME type
    pub mime_type: String,
    /// Size of the upload in bytes
    pub byte_len: usize,
}

/// An uploaded image staged in a temp file and not yet analyzed
#[derive(Debug)]
pub struct PendingImage {
    image_ref: ImageRef,
    format: ImageFormat,
    file: NamedTempFile,
}

impl PendingImage {
    /// Validate and stage uploaded bytes
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unsupported extension or content that is
    /// neither JPEG nor PNG, and a storage error if the temp file cannot be written.
    pub fn from_bytes(file_name: impl Into<String>, bytes: &[u8]) -> AppResult<Self> {
        let file_name = file_name.into();
        if !has_accepted_extension(&file_name) {
            return Err(AppError::invalid_input(format!(
                "Unsupported file type for {file_name}: expected one of {}",
                ACCEPTED_EXTENSIONS.join(", ")
            )));
        }
        let format = ImageFormat::sniff(bytes).ok_or_else(|| {
            AppError::invalid_input(format!("{file_name} is not a JPEG or PNG image"))
        })?;

        let mut file = Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(&format!(".{}", format.extension()))
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let image_ref = ImageRef {
            id: Uuid::new_v4(),
            file_name,
            mime_type: format.mime_type().to_owned(),
            byte_len: bytes.len(),
        };
        debug!(
            upload_id = %image_ref.id,
            file_name = %image_ref.file_name,
            bytes = image_ref.byte_len,
            path = %file.path().display(),
            "Staged upload"
        );

        Ok(Self {
            image_ref,
            format,
            file,
        })
    }

    /// Read a file from disk and stage it as an upload
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the file is missing, otherwise the same
    /// errors as [`PendingImage::from_bytes`].
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AppError::not_found(format!("Image {}", path.display()))
            } else {
                AppError::storage(format!("Failed to read {}: {e}", path.display())).with_source(e)
            }
        })?;
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        Self::from_bytes(file_name, &bytes)
    }

    /// Reference recorded on the user turn for this upload
    #[must_use]
    pub const fn image_ref(&self) -> &ImageRef {
        &self.image_ref
    }

    /// Detected format
    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    /// Location of the staged temp file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the staged bytes back from the temp file
    ///
    /// # Errors
    ///
    /// Returns a storage error if the temp file cannot be read.
    pub fn read_bytes(&self) -> AppResult<Vec<u8>> {
        Ok(fs::read(self.file.path())?)
    }

    /// Encode the staged image for a chat message
    ///
    /// # Errors
    ///
    /// Returns a storage error if the temp file cannot be read.
    pub fn to_attachment(&self) -> AppResult<ImageAttachment> {
        let bytes = self.read_bytes()?;
        Ok(ImageAttachment::from_bytes(self.format.mime_type(), &bytes))
    }

    /// Delete the temp file
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file could not be removed. The handle is
    /// consumed either way.
    pub fn release(self) -> AppResult<()> {
        let upload_id = self.image_ref.id;
        let path = self.file.path().to_path_buf();
        self.file.close().map_err(|e| {
            AppError::storage(format!("Failed to remove {}: {e}", path.display())).with_source(e)
        })?;
        debug!(%upload_id, "Released upload");
        Ok(())
    }
}
