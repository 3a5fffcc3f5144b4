//! Content types and disposition policy for served objects.

/// Fallback when neither the backend nor the extension table knows the type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content types served as attachments unless a route says otherwise.
const DOWNLOAD_TYPES: &[&str] = &[
    "application/zip",
    "application/x-zip-compressed",
    "application/x-tar",
    "application/gzip",
    "application/x-gzip",
    "application/x-7z-compressed",
    "application/vnd.rar",
    "application/x-rar-compressed",
    "application/x-bzip",
    "application/x-bzip2",
    "application/pdf",
    DEFAULT_CONTENT_TYPE,
];

/// Look up a content type by file extension (case-insensitive).
///
/// Text types carry an explicit UTF-8 charset.
pub fn from_extension(key: &str) -> Option<String> {
    let essence = mime_guess::from_path(key).first_raw()?;
    if essence.starts_with("text/") || essence == "application/javascript" {
        Some(format!("{essence}; charset=utf-8"))
    } else {
        Some(essence.to_string())
    }
}

/// Backend type first, then the extension table, then the generic binary type.
pub fn resolve_content_type(stored: Option<&str>, key: &str) -> String {
    stored
        .filter(|ct| !ct.trim().is_empty())
        .map(str::to_string)
        .or_else(|| from_extension(key))
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// Whether a content type is downloaded rather than displayed by default.
pub fn downloads_by_default(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    DOWNLOAD_TYPES.contains(&essence.as_str())
}

/// `Content-Disposition` value naming the last key segment.
pub fn attachment_disposition(key: &str) -> String {
    let file_name = key.rsplit('/').next().unwrap_or(key).replace('"', "");
    format!("attachment; filename=\"{file_name}\"")
}
