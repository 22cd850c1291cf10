//! Identifier generation and validation shared by the store and the HTTP layer.
//!
//! Identifier format: `{uuid simple}-{sanitized original filename}`.

use uuid::Uuid;

const MAX_FILENAME_LENGTH: usize = 180;
const TOKEN_LENGTH: usize = 32;

/// Whether `id` may be used as a file name directly under the store directory.
///
/// Rejects the empty string, parent-directory sequences and both path separators.
pub fn is_valid_media_id(id: &str) -> bool {
    !id.is_empty() && !id.contains("..") && !id.contains('/') && !id.contains('\\')
}

/// Generate a fresh identifier for an uploaded file.
pub fn generate_media_id(original_name: &str) -> String {
    format!(
        "{}-{}",
        Uuid::new_v4().simple(),
        sanitize_filename(original_name)
    )
}

/// The original file name part of an identifier, or the identifier itself if it has
/// no token prefix.
pub fn original_name_from_id(id: &str) -> &str {
    let has_token = id.len() > TOKEN_LENGTH + 1
        && id.as_bytes()[TOKEN_LENGTH] == b'-'
        && id.as_bytes()[..TOKEN_LENGTH]
            .iter()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b));

    if has_token {
        &id[TOKEN_LENGTH + 1..]
    } else {
        id
    }
}

/// Reduce a client-supplied file name to characters safe in a URL path segment.
///
/// Directory components are dropped, anything outside `[A-Za-z0-9._-]` becomes `_`,
/// runs of dots collapse so the result never contains `..`, and names that end up
/// shorter than three characters become `file`.
pub fn sanitize_filename(filename: &str) -> String {
    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let mut sanitized = String::with_capacity(filename_only.len());
    for c in filename_only.chars().take(MAX_FILENAME_LENGTH) {
        let c = if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if c == '.' && sanitized.ends_with('.') {
            continue;
        }
        sanitized.push(c);
    }

    let trimmed = sanitized.trim_matches('.');
    if trimmed.len() < 3 {
        return "file".to_string();
    }

    trimmed.to_string()
}
