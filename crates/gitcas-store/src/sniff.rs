//! Filename inference for uploads that arrive without a name.
//!
//! The extension comes from the content's magic bytes. When the bytes carry
//! no signature (plain text, CSS, SVG) the declared media type is used
//! instead.

use chrono::{DateTime, Utc};
use gitcas_core::AssetName;

use crate::error::StoreError;

/// Name unnamed content as `"{unix_millis}.{ext}"`.
pub fn infer_name(
    bytes: &[u8],
    media_type: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AssetName, StoreError> {
    let ext = infer::get(bytes)
        .map(|kind| kind.extension().to_string())
        .or_else(|| media_type.and_then(extension_for_media_type))
        .ok_or_else(|| {
            StoreError::Validation(
                "cannot infer a file type for unnamed content; supply a name".into(),
            )
        })?;
    Ok(AssetName::new(&format!("{}.{ext}", now.timestamp_millis()))?)
}

fn extension_for_media_type(media_type: &str) -> Option<String> {
    let essence = media_type.split(';').next()?.trim().to_ascii_lowercase();
    let known = match essence.as_str() {
        "text/plain" => Some("txt"),
        "text/html" => Some("html"),
        "text/css" => Some("css"),
        "text/csv" => Some("csv"),
        "text/markdown" => Some("md"),
        "text/javascript" | "application/javascript" => Some("js"),
        "application/json" => Some("json"),
        "image/svg+xml" => Some("svg"),
        _ => None,
    };
    if let Some(ext) = known {
        return Some(ext.to_string());
    }
    // Fall back to a plain alphanumeric subtype, e.g. image/webp.
    let (_, sub) = essence.split_once('/')?;
    (!sub.is_empty() && sub.len() <= 16 && sub.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| sub.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn at() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
    }

    #[test]
    fn png_magic_names_png() {
        let name = infer_name(PNG_MAGIC, None, at()).unwrap();
        assert_eq!(name.as_str(), "1700000000123.png");
    }

    #[test]
    fn magic_bytes_win_over_declared_type() {
        let name = infer_name(PNG_MAGIC, Some("text/plain"), at()).unwrap();
        assert!(name.as_str().ends_with(".png"));
    }

    #[test]
    fn text_falls_back_to_media_type() {
        let name = infer_name(b"hello", Some("text/plain; charset=utf-8"), at()).unwrap();
        assert_eq!(name.as_str(), "1700000000123.txt");
    }

    #[test]
    fn unknown_content_without_type_is_validation_error() {
        let err = infer_name(b"hello", None, at()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn odd_subtypes_are_not_used_as_extensions() {
        assert_eq!(extension_for_media_type("application/x-foo+bar"), None);
        assert_eq!(
            extension_for_media_type("image/webp").as_deref(),
            Some("webp")
        );
    }
}
