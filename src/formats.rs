//! Format Policy - Accepted Upload Formats
//!
//! ## Responsibilities
//!
//! - Accepted extension list and default size ceiling
//! - Extension -> MIME type table
//! - Inline vs attachment disposition for downloads
//! - Human readable sizes for logs

use std::path::Path;

/// One mebibyte
pub const ONE_MB: u64 = 1024 * 1024;

/// Default per-file size ceiling (1 GB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * ONE_MB;

/// Extra body allowance for multipart boundaries and part headers
pub const MULTIPART_OVERHEAD: u64 = 1024;

/// Fallback when nothing better is known
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Extensions accepted for upload (lowercase, no dot)
pub const ACCEPTED_FORMATS: &[&str] = &[
    "mp3", "mp4", "mkv", "png", "jpeg", "jpg", "pdf", "webm", "ogg", "txt", "json", "yaml",
    "yml", "zip",
];

/// Extensions served with `Content-Disposition: inline` so browsers can play them
const INLINE_FORMATS: &[&str] = &["mp3", "webm", "ogg"];

/// Lowercased extension without the dot, if any
pub fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Whether the filename carries an accepted extension
pub fn is_accepted(filename: &str) -> bool {
    extension(filename)
        .map(|ext| ACCEPTED_FORMATS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// MIME type guessed from the filename extension
pub fn content_type_for(filename: &str) -> &'static str {
    let Some(ext) = extension(filename) else {
        return FALLBACK_CONTENT_TYPE;
    };

    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "audio/webm",
        "ogg" => "audio/ogg",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "yaml" | "yml" => "text/yaml",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Declared content type if non-empty, otherwise guessed from the filename
pub fn resolve_content_type(filename: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim) {
        Some(declared) if !declared.is_empty() => declared.to_string(),
        _ => content_type_for(filename).to_string(),
    }
}

/// Whether downloads of this file should be displayed inline
pub fn is_inline(filename: &str) -> bool {
    extension(filename)
        .map(|ext| INLINE_FORMATS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// `Content-Disposition` header value for a download
pub fn content_disposition(filename: &str) -> String {
    let disposition = if is_inline(filename) { "inline" } else { "attachment" };
    // Quotes and line breaks would break out of the quoted-string
    let safe_name: String = filename
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    format!("{}; filename=\"{}\"", disposition, safe_name)
}

/// Human readable size for logs ("512 bytes", "3.50 MB")
pub fn format_size(size: u64) -> String {
    if size < ONE_MB {
        format!("{} bytes", size)
    } else {
        format!("{:.2} MB", size as f64 / ONE_MB as f64)
    }
}
