use thiserror::Error;

/// Everything that can go wrong while driving a page.
///
/// Most variants never escape the engine: they are recovered as close to their
/// origin as possible and turned into a missing field, a dropped card, a short
/// page list or an empty result.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out waiting for {selector}")]
    Timeout { selector: String },

    #[error("element went stale before it could be read")]
    StaleElement,

    #[error("no element matches {selector}")]
    ElementNotFound { selector: String },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    #[error("browser error: {0}")]
    Browser(#[source] anyhow::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn navigation(url: &str, reason: impl ToString) -> Self {
        ScrapeError::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, ScrapeError::StaleElement)
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_helpers() {
        assert!(ScrapeError::StaleElement.is_stale());
        let timeout = ScrapeError::Timeout {
            selector: "[data-cy=\"serpCard\"]".to_string(),
        };
        assert!(!timeout.is_stale());
    }

    #[test]
    fn test_navigation_message() {
        let err = ScrapeError::navigation("https://www.hellowork.com", "net::ERR_NAME_NOT_RESOLVED");
        assert_eq!(
            err.to_string(),
            "navigation to https://www.hellowork.com failed: net::ERR_NAME_NOT_RESOLVED"
        );
    }
}
