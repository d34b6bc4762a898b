use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Numeric Subversion error code, as printed by the client (`svn: E155004: ...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    /// Working copy administrative area is locked.
    pub const WC_LOCKED: Self = Self(155004);
    /// A previous operation was interrupted; the working copy needs cleanup.
    pub const WC_CLEANUP_REQUIRED: Self = Self(155037);
    /// Local files are in the way of the update.
    pub const WC_OBSTRUCTED_UPDATE: Self = Self(155000);
    /// Unversioned item in the way of a switch or update.
    pub const WC_PATH_UNEXPECTED_STATUS: Self = Self(155035);
    pub const WC_NOT_WORKING_COPY: Self = Self(155007);
    pub const WC_PATH_NOT_FOUND: Self = Self(155010);
    pub const CANCELLED: Self = Self(200015);

    /// Extract the first error code from client output.
    pub fn find_in(output: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"\bE(\d{6})\b").expect("error code pattern is a valid regex")
        });

        pattern
            .captures(output)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .map(Self)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:06}", self.0)
    }
}

/// Message fragments the client prints when an operation is interrupted.
const CANCELLATION_SENTINELS: [&str; 2] = ["Operation cancelled", "Caught signal"];

/// How the update engine reacts to a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Another process may own the working copy; fail without touching it.
    Locked,
    /// Local files block the operation; clean and check out again.
    Obstructed,
    /// Operator or agent interrupted the operation.
    Cancelled,
    /// The path is not (or no longer) a working copy.
    NotWorkingCopy,
    /// Anything else; the result of the attempt is unknown.
    Other,
}

impl FailureKind {
    pub fn classify(code: Option<ErrorCode>, message: &str) -> Self {
        if code == Some(ErrorCode::CANCELLED)
            || CANCELLATION_SENTINELS
                .iter()
                .any(|sentinel| message.contains(sentinel))
        {
            return Self::Cancelled;
        }

        match code {
            Some(ErrorCode::WC_LOCKED) | Some(ErrorCode::WC_CLEANUP_REQUIRED) => Self::Locked,
            Some(ErrorCode::WC_OBSTRUCTED_UPDATE) | Some(ErrorCode::WC_PATH_UNEXPECTED_STATUS) => {
                Self::Obstructed
            }
            Some(ErrorCode::WC_NOT_WORKING_COPY) | Some(ErrorCode::WC_PATH_NOT_FOUND) => {
                Self::NotWorkingCopy
            }
            _ => Self::Other,
        }
    }
}
