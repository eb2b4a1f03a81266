use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid function definition: {0}")]
    InvalidFunctionDefinition(String),

    /// The request never completed.
    #[error("Network error: {0}")]
    Transport(String),

    /// The request completed but the server rejected it.
    #[error("Server returned {status} {reason}")]
    HttpStatus {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Model '{0}' does not support chat completions")]
    UnsupportedModel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl PlaygroundError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PlaygroundError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl serde::Serialize for PlaygroundError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type PlaygroundResult<T> = Result<T, PlaygroundError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_message_carries_code() {
        let err = PlaygroundError::HttpStatus {
            status: 500,
            reason: "Internal Server Error".into(),
            body: String::new(),
        };
        assert_eq!(err.to_string(), "Server returned 500 Internal Server Error");
        assert_eq!(err.http_status(), Some(500));
        assert!(!err.is_transport());
    }

    #[test]
    fn transport_is_distinguishable() {
        let err = PlaygroundError::Transport("connection refused".into());
        assert!(err.is_transport());
        assert_eq!(err.http_status(), None);
        assert!(err.to_string().starts_with("Network error"));
    }

    #[test]
    fn serializes_as_display_string() {
        let err = PlaygroundError::UnsupportedModel("tts-1".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Model 'tts-1' does not support chat completions\"");
    }
}
