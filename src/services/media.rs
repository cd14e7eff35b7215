//! Local-disk storage for uploaded show images.

use image::ImageFormat;
use std::path::Path;
use uuid::Uuid;

use crate::error::ApiError;

const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Rejects uploads whose filename or content is not a supported image.
/// The content check reads only the magic-byte signature.
pub fn validate_image(original_name: &str, data: &[u8]) -> Result<(), ApiError> {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some(e) if ALLOWED_IMAGE_EXTENSIONS.contains(&e) => {}
        _ => {
            return Err(ApiError::Validation(format!(
                "unsupported image extension, expected one of: {}",
                ALLOWED_IMAGE_EXTENSIONS.join(", ")
            )))
        }
    }

    let format = image::guess_format(data)
        .map_err(|_| ApiError::Validation("file content is not a recognized image".to_string()))?;
    if !matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif | ImageFormat::WebP
    ) {
        return Err(ApiError::Validation(
            "file content is not a supported image format".to_string(),
        ));
    }

    Ok(())
}

/// Lowercase, ascii-alphanumeric, dash-separated form of a title.
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    out
}

/// `{slug(title)}-{uuid}{ext}`, keeping the original file extension.
pub fn image_filename(title: &str, original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}-{}{}", slugify(title), Uuid::new_v4(), ext)
}

/// Writes the image under `{media_root}/uploads/shows/` and returns the
/// relative path stored on the show row.
pub async fn store_show_image(
    media_root: &str,
    title: &str,
    original_name: &str,
    data: &[u8],
) -> Result<String, ApiError> {
    let relative = format!("uploads/shows/{}", image_filename(title, original_name));
    let full = Path::new(media_root).join(&relative);

    if let Some(parent) = full.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
    }
    tokio::fs::write(&full, data)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_flattens_punctuation_and_case() {
        assert_eq!(slugify("Journey to Mars"), "journey-to-mars");
        assert_eq!(slugify("  Black   Holes! "), "black-holes");
        assert_eq!(slugify("Orion's Belt"), "orion-s-belt");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn image_filename_keeps_the_extension() {
        let name = image_filename("Journey to Mars", "photo.JPG");
        assert!(name.starts_with("journey-to-mars-"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn image_filename_without_extension() {
        let name = image_filename("Nebulae", "rawupload");
        assert!(name.starts_with("nebulae-"));
        assert!(!name.contains('.'));
    }

    #[test]
    fn image_filenames_are_unique_per_call() {
        let a = image_filename("Nebulae", "a.png");
        let b = image_filename("Nebulae", "a.png");
        assert_ne!(a, b);
    }

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn validate_image_accepts_real_image_signatures() {
        assert!(validate_image("nebula.png", PNG_HEADER).is_ok());
        assert!(validate_image("nebula.JPG", JPEG_HEADER).is_ok());
    }

    #[test]
    fn validate_image_rejects_disallowed_extensions() {
        let err = validate_image("nebula.bmp", PNG_HEADER).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = validate_image("nebula", PNG_HEADER).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn validate_image_rejects_non_image_content() {
        let err = validate_image("nebula.png", b"fake image data").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
