//! Label-only upload stub. File contents are never read or sent anywhere.

use crate::error::AttachmentError;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["txt", "csv", "json", "md"];

/// Case-sensitive check of the suffix after the last `.`.
pub fn is_supported_attachment(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// Transcript text recorded for an accepted attachment.
pub fn attachment_marker(name: &str) -> String {
    format!("uploaded: {}", name)
}

pub fn check_attachment(name: &str) -> Result<String, AttachmentError> {
    if is_supported_attachment(name) {
        Ok(attachment_marker(name))
    } else {
        Err(AttachmentError::UnsupportedExtension {
            name: name.to_string(),
        })
    }
}
