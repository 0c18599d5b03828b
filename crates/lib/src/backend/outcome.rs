//! The only value that leaves the invoker: an answer, or a classified failure with user-safe text.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Non-2xx status, or a 2xx whose payload reported an error.
    HttpStatus,
    Timeout,
    Connection,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Connection => "connection",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Text shown to the user in place of an answer.
    pub fn apology(&self) -> &'static str {
        match self {
            ErrorKind::HttpStatus => "Sorry, I encountered an error processing your request.",
            ErrorKind::Timeout => "Sorry, my request timed out. Please try again.",
            ErrorKind::Connection => "Sorry, I'm having trouble connecting to my backend.",
            ErrorKind::Unknown => "Sorry, something went wrong.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOutcome {
    Answered { text: String },
    Failed { kind: ErrorKind, text: String },
}

impl BackendOutcome {
    pub fn answered(text: impl Into<String>) -> Self {
        BackendOutcome::Answered { text: text.into() }
    }

    pub fn failed(kind: ErrorKind) -> Self {
        BackendOutcome::Failed {
            kind,
            text: kind.apology().to_string(),
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, BackendOutcome::Answered { .. })
    }

    /// Text to post back to the channel (the answer or the apology).
    pub fn text(&self) -> &str {
        match self {
            BackendOutcome::Answered { text } | BackendOutcome::Failed { text, .. } => text,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            BackendOutcome::Answered { .. } => None,
            BackendOutcome::Failed { kind, .. } => Some(*kind),
        }
    }

    /// "none" for answers, otherwise the error kind.
    pub fn error_label(&self) -> &'static str {
        self.error_kind().map(|k| k.as_str()).unwrap_or("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_carries_generic_text_only() {
        let o = BackendOutcome::failed(ErrorKind::Timeout);
        assert!(!o.success());
        assert_eq!(o.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(o.text(), "Sorry, my request timed out. Please try again.");
        assert_eq!(o.error_label(), "timeout");
    }

    #[test]
    fn answered_outcome_has_no_error_kind() {
        let o = BackendOutcome::answered("42");
        assert!(o.success());
        assert_eq!(o.text(), "42");
        assert_eq!(o.error_label(), "none");
    }
}
