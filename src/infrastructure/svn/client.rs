use super::error_code::{ErrorCode, FailureKind};
use crate::domain::entities::authentication::Authentication;
use crate::domain::entities::dir_entry::{DirEntry, NodeKind};
use crate::domain::value_objects::depth::Depth;
use crate::domain::value_objects::revision::Revision;
use crate::domain::value_objects::svn_info::SvnInfo;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Common interface to a Subversion client.
///
/// All operations are awaited one at a time by the update engine; an
/// implementation never needs to support concurrent calls against the same
/// working copy.
#[async_trait]
pub trait SvnClient: Send + Sync {
    /// Full checkout of `request.url` into `request.path`. Returns the revision checked out.
    async fn checkout(
        &self,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError>;

    /// Update the working copy at `request.path`.
    async fn update(
        &self,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError>;

    /// Switch the working copy at `request.path` to `request.url`.
    async fn switch(
        &self,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError>;

    /// Recursively revert local modifications.
    async fn revert(&self, path: &Path) -> Result<(), SvnError>;

    /// `svn info` on a working copy path or a URL.
    async fn info(&self, target: &str, auth: Option<&Authentication>)
        -> Result<NodeInfo, SvnError>;

    /// `svn list` on a URL.
    async fn list(
        &self,
        url: &str,
        auth: Option<&Authentication>,
    ) -> Result<Vec<DirEntry>, SvnError>;

    /// Check if a directory is the root of a working copy
    fn is_working_copy(&self, path: &Path) -> bool {
        path.join(".svn").is_dir()
    }
}

/// Parameters shared by checkout, update and switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    /// Working copy directory
    pub path: PathBuf,
    /// Repository URL (without `@revision`)
    pub url: String,
    pub revision: Revision,
    pub depth: Depth,
    pub ignore_externals: bool,
}

/// Result of `svn info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub url: String,
    pub revision: u64,
    pub last_changed_revision: u64,
    pub kind: NodeKind,
}

impl NodeInfo {
    pub fn to_svn_info(&self) -> SvnInfo {
        SvnInfo::new(self.url.clone(), self.revision)
    }
}

/// What happened to a path during an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Add,
    Delete,
    Update,
    Replace,
    Merge,
    Conflict,
    Exists,
    /// An svn:externals definition was fetched
    UpdateExternal,
    UpdateCompleted,
    Skip,
    Unknown,
}

impl EventAction {
    /// The one-letter code svn prints for this action.
    pub fn status_letter(self) -> Option<char> {
        match self {
            Self::Add => Some('A'),
            Self::Delete => Some('D'),
            Self::Update => Some('U'),
            Self::Replace => Some('R'),
            Self::Merge => Some('G'),
            Self::Conflict => Some('C'),
            Self::Exists => Some('E'),
            _ => None,
        }
    }

    pub fn from_status_letter(letter: char) -> Self {
        match letter {
            'A' => Self::Add,
            'D' => Self::Delete,
            'U' => Self::Update,
            'R' => Self::Replace,
            'G' => Self::Merge,
            'C' => Self::Conflict,
            'E' => Self::Exists,
            _ => Self::Unknown,
        }
    }
}

/// Progress notification emitted by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    pub action: EventAction,
    /// The action the client was performing when it emitted the event
    pub expected_action: EventAction,
    pub path: PathBuf,
    pub url: Option<String>,
    pub revision: Option<u64>,
    pub node_kind: NodeKind,
}

impl UpdateEvent {
    pub fn new(action: EventAction, path: impl Into<PathBuf>) -> Self {
        Self {
            action,
            expected_action: EventAction::Unknown,
            path: path.into(),
            url: None,
            revision: None,
            node_kind: NodeKind::Unknown,
        }
    }

    pub fn with_expected_action(mut self, action: EventAction) -> Self {
        self.expected_action = action;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn with_node_kind(mut self, kind: NodeKind) -> Self {
        self.node_kind = kind;
        self
    }
}

/// Receives progress events while an operation runs
pub trait UpdateEventHandler: Send {
    fn handle_event(&mut self, event: &UpdateEvent);
}

/// Handler that drops every event
#[derive(Debug, Default)]
pub struct IgnoreEvents;

impl UpdateEventHandler for IgnoreEvents {
    fn handle_event(&mut self, _event: &UpdateEvent) {}
}

/// Errors that can occur during Subversion operations
#[derive(Debug, thiserror::Error)]
pub enum SvnError {
    #[error("svn {operation} failed{}: {message}", code_suffix(.code))]
    OperationFailed {
        operation: String,
        code: Option<ErrorCode>,
        message: String,
    },

    #[error("svn executable not found: {executable}")]
    ExecutableNotFound { executable: String },

    #[error("Unexpected svn output for {operation}: {output}")]
    UnexpectedOutput { operation: String, output: String },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

fn code_suffix(code: &Option<ErrorCode>) -> String {
    code.map(|c| format!(" ({})", c)).unwrap_or_default()
}

impl SvnError {
    /// Build an operation failure, extracting the error code from the message
    pub fn operation_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::OperationFailed {
            operation: operation.into(),
            code: ErrorCode::find_in(&message),
            message: message.trim().to_string(),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::OperationFailed { code, .. } => *code,
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::OperationFailed { code, message, .. } => FailureKind::classify(*code, message),
            Self::IoError { source } if source.kind() == std::io::ErrorKind::Interrupted => {
                FailureKind::Cancelled
            }
            _ => FailureKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_failed_extracts_code() {
        let error = SvnError::operation_failed(
            "switch",
            "svn: E155000: Failed to add directory 'lib': an unversioned directory of the same name already exists\n",
        );
        assert_eq!(error.code(), Some(ErrorCode::WC_OBSTRUCTED_UPDATE));
        assert_eq!(error.failure_kind(), FailureKind::Obstructed);
        assert!(error.to_string().starts_with("svn switch failed (E155000): "));
    }

    #[test]
    fn test_interrupted_io_is_cancellation() {
        let error: SvnError =
            std::io::Error::new(std::io::ErrorKind::Interrupted, "interrupted").into();
        assert_eq!(error.failure_kind(), FailureKind::Cancelled);
    }

    #[test]
    fn test_status_letters() {
        assert_eq!(EventAction::from_status_letter('A'), EventAction::Add);
        assert_eq!(EventAction::Update.status_letter(), Some('U'));
        assert_eq!(EventAction::UpdateExternal.status_letter(), None);
    }
}
