//! Attachment validation rules.
//!
//! Pure functions with no I/O. The size ceiling is declared here and
//! enforced by the upload pipeline while bytes arrive.

use std::path::Path;

use super::error::ValidationError;
use super::types::{DocumentCategory, FileKind};

/// Largest attachment accepted, in bytes (5 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

/// Longest filename kept, in characters.
pub const MAX_FILENAME_CHARS: usize = 255;

/// A file whose declared fields passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile {
    /// Sanitized filename.
    pub filename: String,
    /// Kind named by both the extension and the media type.
    pub kind: FileKind,
}

/// An upload whose declared fields all passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAttachment {
    /// Target category.
    pub category: DocumentCategory,
    /// Validated file.
    pub file: ValidatedFile,
}

/// Check a category name.
///
/// # Errors
///
/// Returns `ValidationError::UnknownCategory` for anything outside the set.
pub fn validate_category(category: &str) -> Result<DocumentCategory, ValidationError> {
    DocumentCategory::parse(category)
        .ok_or_else(|| ValidationError::UnknownCategory(category.to_string()))
}

/// Check a filename and declared media type.
///
/// The extension is matched case-insensitively. Media type parameters such
/// as `; charset=utf-8` are ignored. Extension and media type must name the
/// same kind.
///
/// # Errors
///
/// Returns the first rule the file breaks.
pub fn validate_file(filename: &str, media_type: &str) -> Result<ValidatedFile, ValidationError> {
    let filename = sanitize_filename(filename)?;

    let extension = Path::new(&filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| ValidationError::MissingExtension(filename.clone()))?;

    let kind = FileKind::from_extension(extension)
        .ok_or_else(|| ValidationError::UnsupportedExtension(extension.to_ascii_lowercase()))?;

    let declared = normalize_media_type(media_type);
    match FileKind::from_media_type(&declared) {
        None => return Err(ValidationError::UnsupportedMediaType(declared)),
        Some(declared_kind) if declared_kind != kind => {
            return Err(ValidationError::MediaTypeMismatch {
                declared,
                extension: kind.extension(),
                expected: kind.media_type(),
            });
        }
        Some(_) => {}
    }

    Ok(ValidatedFile { filename, kind })
}

/// Check every declared field of an upload.
///
/// # Errors
///
/// Returns the first rule the upload breaks, category first.
pub fn validate(
    category: &str,
    filename: &str,
    media_type: &str,
) -> Result<ValidatedAttachment, ValidationError> {
    let category = validate_category(category)?;
    let file = validate_file(filename, media_type)?;
    Ok(ValidatedAttachment { category, file })
}

/// Strip path separators and NUL, trim whitespace, and cap the length.
///
/// # Errors
///
/// Returns `ValidationError::EmptyFilename` if nothing is left.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    let cleaned: String = filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .collect();
    let trimmed = cleaned.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }

    let char_count = trimmed.chars().count();
    if char_count <= MAX_FILENAME_CHARS {
        return Ok(trimmed.to_string());
    }

    // Keep the extension when truncating so the kind survives.
    let ext = Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().count() < 16)
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let keep = MAX_FILENAME_CHARS - ext.chars().count();
    let stem: String = trimmed.chars().take(keep).collect();
    Ok(format!("{stem}{ext}"))
}

fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
