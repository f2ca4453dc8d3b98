use thiserror::Error;

/// Normalized remote-store failures. Transport-specific codes never leak
/// past this boundary; the sync manager collapses these further into
/// boolean/absent results for its callers.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unauthorized - token may be expired")]
    Unauthorized,

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("rate limited - please wait before retrying")]
    RateLimited,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl RemoteError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            // Back off to a char boundary; a fixed byte offset can land
            // inside a multi-byte character.
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..cut],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => RemoteError::Unauthorized,
            403 => RemoteError::PermissionDenied(truncated),
            404 => RemoteError::NotFound(truncated),
            429 => RemoteError::RateLimited,
            500..=599 => RemoteError::Backend(truncated),
            _ => RemoteError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            RemoteError::from_status(StatusCode::UNAUTHORIZED, ""),
            RemoteError::Unauthorized
        ));
        assert!(matches!(
            RemoteError::from_status(StatusCode::FORBIDDEN, "denied"),
            RemoteError::PermissionDenied(_)
        ));
        assert!(matches!(
            RemoteError::from_status(StatusCode::NOT_FOUND, ""),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            RemoteError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            RemoteError::Backend(_)
        ));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = RemoteError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        let message = err.to_string();
        assert!(message.contains("truncated"));
        assert!(message.len() < body.len());
    }

    #[test]
    fn test_truncation_respects_multibyte_characters() {
        // Byte 500 falls inside a multi-byte character; truncation must
        // back off to the previous boundary instead of panicking.
        let mut body = "x".repeat(499);
        body.push_str(&"日".repeat(10));
        let err = RemoteError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        let message = err.to_string();
        assert!(message.contains("truncated"));
        assert!(message.contains(&body.len().to_string()));
    }
}
