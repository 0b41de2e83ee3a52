//! Stored-name policy for uploaded files.
//!
//! A stored name is `<millis>-<token>-<sanitized original>`. Sanitizing maps
//! every character outside word characters, space, parentheses, dot and
//! hyphen to `_`, so a stored name is always a single path component.

use chrono::Utc;
use rand::Rng;

use crate::error::FormdeskError;

/// Longest stored name accepted anywhere (common filesystem component limit).
pub const MAX_STORED_NAME_LEN: usize = 255;

/// Budget for the sanitized part so the timestamp and token still fit.
const MAX_SANITIZED_LEN: usize = 200;

/// Longest extension (including the dot) kept intact when truncating.
const MAX_KEPT_EXTENSION: usize = 16;

const FALLBACK_NAME: &str = "file";

fn is_upload_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '(' | ')' | '.' | '-')
}

/// Characters accepted in a stored name passed back for deletion.
fn is_stored_name_char(c: char) -> bool {
    is_upload_char(c) || c == ','
}

/// Replace every disallowed character with `_` and cap the length,
/// keeping a short extension when the name has to be cut.
pub fn sanitize_filename(original: &str) -> String {
    let cleaned: String = original
        .chars()
        .map(|c| if is_upload_char(c) { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    truncate_keeping_extension(cleaned, MAX_SANITIZED_LEN)
}

// Input is ASCII after sanitizing, so byte offsets are char boundaries.
fn truncate_keeping_extension(name: String, max: usize) -> String {
    if name.len() <= max {
        return name;
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_KEPT_EXTENSION => {
            let ext = &name[dot..];
            format!("{}{}", &name[..max - ext.len()], ext)
        }
        _ => name[..max].to_string(),
    }
}

pub fn compose_stored_name(millis: i64, token: &str, sanitized: &str) -> String {
    format!("{millis}-{token}-{sanitized}")
}

/// Eight lowercase hex characters.
pub fn random_token() -> String {
    format!("{:08x}", rand::thread_rng().gen::<u32>())
}

/// Fresh stored name for an upload, stamped with the current wall-clock millis.
pub fn new_stored_name(original: &str) -> String {
    compose_stored_name(
        Utc::now().timestamp_millis(),
        &random_token(),
        &sanitize_filename(original),
    )
}

/// Check a client-supplied stored name before it is used to touch storage.
pub fn validate_stored_name(name: &str) -> Result<(), FormdeskError> {
    if name.is_empty() {
        return Err(FormdeskError::InvalidName("empty filename".into()));
    }
    if name.len() > MAX_STORED_NAME_LEN {
        return Err(FormdeskError::InvalidName(format!(
            "filename longer than {MAX_STORED_NAME_LEN} bytes"
        )));
    }
    if !name.chars().all(is_stored_name_char) {
        return Err(FormdeskError::InvalidName(format!(
            "invalid filename format: {name}"
        )));
    }
    if name.chars().all(|c| c == '.') {
        return Err(FormdeskError::InvalidName(format!(
            "invalid filename format: {name}"
        )));
    }
    Ok(())
}
