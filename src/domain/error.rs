use thiserror::Error;

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Invalid video URL or video ID")]
    InvalidInput,

    #[error("{0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl AppError {
    /// Text shown in the dialog. Blank messages fall back to a generic one.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNEXPECTED_ERROR.to_string()
        } else {
            message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_message_falls_back() {
        assert_eq!(AppError::Api("  ".into()).user_message(), UNEXPECTED_ERROR);
        assert_eq!(AppError::Api("Video unavailable".into()).user_message(), "Video unavailable");
    }
}
