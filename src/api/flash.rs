//! Flash messages carried in the query string

use axum::response::Redirect;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Error,
    Success,
}

impl FlashKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashKind::Error => "error",
            FlashKind::Success => "success",
        }
    }
}

/// `?error=...` / `?success=...` of the current request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Flash {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            success: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            error: None,
            success: Some(message.into()),
        }
    }

    /// Messages to render, blank ones dropped
    pub fn messages(&self) -> impl Iterator<Item = (FlashKind, &str)> {
        let error = self.error.as_deref().map(|m| (FlashKind::Error, m));
        let success = self.success.as_deref().map(|m| (FlashKind::Success, m));
        error
            .into_iter()
            .chain(success)
            .filter(|(_, message)| !message.trim().is_empty())
    }
}

/// URL of `path` with the flash message appended
pub fn encoded_path(kind: FlashKind, path: &str, message: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!(
        "{path}{separator}{}={}",
        kind.as_str(),
        urlencoding::encode(message)
    )
}

/// Redirect (303) to `path` carrying a flash message
pub fn encoded_redirect(kind: FlashKind, path: &str, message: &str) -> Redirect {
    Redirect::to(&encoded_path(kind, path, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_url_encoded() {
        assert_eq!(
            encoded_path(FlashKind::Error, "/sign-in", "Invalid login credentials"),
            "/sign-in?error=Invalid%20login%20credentials"
        );
    }

    #[test]
    fn existing_query_gets_ampersand() {
        assert_eq!(
            encoded_path(FlashKind::Success, "/dashboard?page=2", "Done & dusted"),
            "/dashboard?page=2&success=Done%20%26%20dusted"
        );
    }

    #[test]
    fn blank_messages_are_skipped() {
        let flash = Flash {
            error: Some("  ".to_string()),
            success: Some("Saved".to_string()),
        };
        let messages: Vec<_> = flash.messages().collect();
        assert_eq!(messages, vec![(FlashKind::Success, "Saved")]);
    }
}
