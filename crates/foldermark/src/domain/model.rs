//! Domain models for folder markers and their resolution.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// A folder marker located in a block of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    /// Byte range of the marker inside the scanned text.
    pub span: Range<usize>,
    /// Exact matched substring, delimiters included.
    pub raw: String,
    /// Enclosed folder path with segments trimmed and the trailing separator removed.
    pub folder_name: String,
}

/// A folder name paired with the document it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub folder_name: String,
    pub origin: String,
}

impl ResolutionRequest {
    pub fn new(folder_name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            origin: origin.into(),
        }
    }
}

/// What happened to the target folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeKind {
    Created,
    AlreadyExists,
    Skipped,
}

/// Result of resolving a single marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionOutcome {
    pub kind: OutcomeKind,
    /// Vault-relative folder path.
    pub path: String,
}

impl ResolutionOutcome {
    pub fn created(path: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Created,
            path: path.into(),
        }
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::AlreadyExists,
            path: path.into(),
        }
    }

    pub fn skipped(path: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Skipped,
            path: path.into(),
        }
    }
}

/// User-facing message describing a trigger result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum Notice {
    Created(String),
    AlreadyExists(String),
    Skipped(String),
    PlaceholderDeleted(String),
    OriginUnknown,
    Failed(String),
}

impl From<&ResolutionOutcome> for Notice {
    fn from(outcome: &ResolutionOutcome) -> Self {
        match outcome.kind {
            OutcomeKind::Created => Notice::Created(outcome.path.clone()),
            OutcomeKind::AlreadyExists => Notice::AlreadyExists(outcome.path.clone()),
            OutcomeKind::Skipped => Notice::Skipped(outcome.path.clone()),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Created(path) => write!(f, "Created folder: {path}"),
            Notice::AlreadyExists(path) => write!(f, "Folder already exists: {path}"),
            Notice::Skipped(path) => write!(f, "Skipped folder: {path}"),
            Notice::PlaceholderDeleted(path) => write!(f, "Deleted placeholder note: {path}"),
            Notice::OriginUnknown => f.write_str("Could not determine origin note location."),
            Notice::Failed(message) => write!(f, "Failed to resolve folder: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_render_user_messages() {
        let created = ResolutionOutcome::created("Notes/Projects");
        assert_eq!(
            Notice::from(&created).to_string(),
            "Created folder: Notes/Projects"
        );

        let existing = ResolutionOutcome::already_exists("Projects");
        assert_eq!(
            Notice::from(&existing).to_string(),
            "Folder already exists: Projects"
        );

        assert_eq!(
            Notice::OriginUnknown.to_string(),
            "Could not determine origin note location."
        );
    }
}
