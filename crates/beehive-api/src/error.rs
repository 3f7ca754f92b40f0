use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Beehive API returned HTTP {status}: {}", status_detail(.error, .description))]
    Status {
        status: u16,
        error: Option<String>,
        description: Option<String>,
    },
    #[error("Beehive API request failed: {0}")]
    Transport(String),
    #[error("Beehive API response was malformed: {0}")]
    Decode(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("not signed in; run `beehive login` first")]
    NotSignedIn,
}

fn status_detail<'a>(error: &'a Option<String>, description: &'a Option<String>) -> &'a str {
    description
        .as_deref()
        .or(error.as_deref())
        .unwrap_or("no details")
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::NotSignedIn => Some(401),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Status { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}
