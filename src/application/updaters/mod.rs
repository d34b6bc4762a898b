//! Workspace update strategies.
//!
//! Each strategy brings one module location's working copy to the resolved
//! revision. Failures are classified from the svn error code:
//!
//! | kind         | reaction                                          |
//! |--------------|---------------------------------------------------|
//! | locked       | [`UpdateError::WorkspaceLocked`], workspace untouched |
//! | obstructed   | clean the module directory, fresh checkout        |
//! | cancelled    | [`UpdateError::Cancelled`]                        |
//! | anything else| [`UpdateOutcome::Inconclusive`]                   |

pub mod checkout;
pub mod factory;
pub mod switch;
pub mod update;
pub mod update_with_revert;

pub use checkout::CheckoutUpdater;
pub use factory::UpdaterFactory;
pub use switch::SwitchUpdater;
pub use update::UpdateUpdater;
pub use update_with_revert::UpdateWithRevertUpdater;

use crate::application::build_listener::BuildListener;
use crate::application::services::externals_tracker::ExternalsTracker;
use crate::common::error::SvnScmError;
use crate::domain::entities::authentication::Authentication;
use crate::domain::entities::external::External;
use crate::domain::entities::job_config::UpdateStrategy;
use crate::domain::value_objects::module_location::ModuleLocation;
use crate::domain::value_objects::revision::Revision;
use crate::infrastructure::svn::client::{OperationRequest, SvnClient, SvnError};
use crate::infrastructure::svn::error_code::{ErrorCode, FailureKind};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs as async_fs;

/// One module location to bring up to date
#[derive(Clone)]
pub struct UpdateTask {
    pub location: ModuleLocation,
    /// Workspace root; the module lives under `location.local()`
    pub workspace: PathBuf,
    pub revision: Revision,
    pub auth: Option<Authentication>,
    pub listener: Arc<dyn BuildListener>,
}

impl UpdateTask {
    pub fn new(
        location: ModuleLocation,
        workspace: impl Into<PathBuf>,
        revision: Revision,
        listener: Arc<dyn BuildListener>,
    ) -> Self {
        Self {
            location,
            workspace: workspace.into(),
            revision,
            auth: None,
            listener,
        }
    }

    pub fn with_auth(mut self, auth: Option<Authentication>) -> Self {
        self.auth = auth;
        self
    }

    pub fn module_dir(&self) -> PathBuf {
        match self.location.local().trim_end_matches('/') {
            "" | "." => self.workspace.clone(),
            local => self.workspace.join(local),
        }
    }

    pub fn url(&self) -> &str {
        self.location.url()
    }

    fn request(&self) -> OperationRequest {
        OperationRequest {
            path: self.module_dir(),
            url: self.location.url().to_string(),
            revision: self.revision.clone(),
            depth: self.location.depth(),
            ignore_externals: self.location.ignore_externals(),
        }
    }

    fn tracker(&self) -> ExternalsTracker {
        ExternalsTracker::new(
            self.module_dir(),
            self.location.local(),
            Arc::clone(&self.listener),
        )
    }

    fn log(&self, line: &str) {
        self.listener.log(line);
    }
}

impl std::fmt::Debug for UpdateTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateTask")
            .field("location", &self.location)
            .field("workspace", &self.workspace)
            .field("revision", &self.revision)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

/// Result of an update attempt that did not raise an interruption
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Completed {
        revision: u64,
        externals: Vec<External>,
    },
    /// The attempt was abandoned; nothing can be said about the workspace
    Inconclusive {
        code: Option<ErrorCode>,
        message: String,
    },
}

impl UpdateOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn revision(&self) -> Option<u64> {
        match self {
            Self::Completed { revision, .. } => Some(*revision),
            Self::Inconclusive { .. } => None,
        }
    }
}

/// Update failures that stop the build
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("Workspace {} is locked: {message}", .path.display())]
    WorkspaceLocked { path: PathBuf, message: String },

    #[error("Update of {} was cancelled", .path.display())]
    Cancelled { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UpdateError {
    /// The update was interrupted rather than failing on repository content
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::WorkspaceLocked { .. } | Self::Cancelled { .. })
    }

    /// Cancellation is reported to the scheduler but not counted as a failure
    pub fn fails_build(&self) -> bool {
        !matches!(self, Self::Cancelled { .. })
    }
}

impl From<UpdateError> for SvnScmError {
    fn from(error: UpdateError) -> Self {
        match error {
            UpdateError::Cancelled { .. } => SvnScmError::Cancelled,
            UpdateError::Configuration { message } => SvnScmError::config_error(message),
            UpdateError::Io { path, source } => SvnScmError::filesystem_error_with_source(
                "Workspace operation failed",
                Some(path),
                source,
            ),
            locked @ UpdateError::WorkspaceLocked { .. } => {
                SvnScmError::subversion_error_with_source("Workspace is locked", locked)
            }
        }
    }
}

/// Per-attempt state of the update engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Initial,
    DecideStrategy,
    FreshCheckout,
    Switch,
    Update,
    UpdateWithRevert,
    Done,
    Failed,
}

impl UpdateState {
    pub fn can_advance_to(self, next: UpdateState) -> bool {
        use UpdateState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Initial, DecideStrategy | FreshCheckout) => true,
            (DecideStrategy, FreshCheckout | Switch | Update | UpdateWithRevert) => true,
            (UpdateWithRevert, FreshCheckout | Switch | Update) => true,
            (Switch | Update, FreshCheckout | Done) => true,
            (FreshCheckout, Done) => true,
            _ => false,
        }
    }

    pub fn advance(&mut self, next: UpdateState, module_dir: &Path) {
        if self.can_advance_to(next) {
            tracing::debug!(from = ?*self, to = ?next, module = %module_dir.display(), "update state");
        } else {
            tracing::warn!(from = ?*self, to = ?next, module = %module_dir.display(), "unexpected update state transition");
        }
        *self = next;
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// A workspace update strategy
#[async_trait]
pub trait WorkspaceUpdater: Send + Sync {
    fn strategy(&self) -> UpdateStrategy;

    /// Drive the state machine from `Initial` up to, not including, the terminal state
    async fn run(
        &self,
        client: &dyn SvnClient,
        task: &UpdateTask,
        state: &mut UpdateState,
    ) -> Result<UpdateOutcome, UpdateError>;

    async fn perform(
        &self,
        client: &dyn SvnClient,
        task: &UpdateTask,
    ) -> Result<UpdateOutcome, UpdateError> {
        let module_dir = task.module_dir();
        let mut state = UpdateState::Initial;

        if !task.revision.is_valid() {
            tracing::debug!("No usable revision for {}: {}", task.url(), task.revision);
        }
        if let Revision::Invalid(token) = &task.revision {
            task.log(&format!(
                "WARNING: '{}' is not a valid revision for {}; the repository default applies",
                token,
                task.location.remote()
            ));
        }

        let result = self.run(client, task, &mut state).await;
        let terminal = match &result {
            Ok(UpdateOutcome::Completed { .. }) => UpdateState::Done,
            _ => UpdateState::Failed,
        };
        state.advance(terminal, &module_dir);
        result
    }
}

/// Failures that leave the decision to the calling strategy
enum Recoverable {
    Obstructed(SvnError),
    Unknown(SvnError),
}

fn classify(task: &UpdateTask, operation: &str, error: SvnError) -> Result<Recoverable, UpdateError> {
    let path = task.module_dir();
    match error.failure_kind() {
        FailureKind::Locked => {
            task.listener.error(&format!(
                "Workspace {} is locked; not attempting to clean it up: {}",
                path.display(),
                error
            ));
            Err(UpdateError::WorkspaceLocked {
                path,
                message: error.to_string(),
            })
        }
        FailureKind::Cancelled => {
            task.log(&format!("svn {} of {} cancelled", operation, task.url()));
            Err(UpdateError::Cancelled { path })
        }
        FailureKind::Obstructed | FailureKind::NotWorkingCopy => Ok(Recoverable::Obstructed(error)),
        FailureKind::Other => Ok(Recoverable::Unknown(error)),
    }
}

fn inconclusive(task: &UpdateTask, operation: &str, error: SvnError) -> UpdateOutcome {
    let code = error.code();
    let code_label = code.map_or_else(|| "no error code".to_string(), |c| c.to_string());
    task.listener.error(&format!(
        "svn {} of {} at revision {} failed ({}): {}",
        operation,
        task.url(),
        task.revision,
        code_label,
        error
    ));
    tracing::error!(operation, url = task.url(), code = %code_label, "{}", error);

    UpdateOutcome::Inconclusive {
        code,
        message: error.to_string(),
    }
}

/// Remove the module directory
async fn clean_workspace(task: &UpdateTask) -> Result<(), UpdateError> {
    let module_dir = task.module_dir();
    task.log(&format!("Cleaning workspace {}", module_dir.display()));

    if async_fs::metadata(&module_dir).await.is_ok() {
        async_fs::remove_dir_all(&module_dir)
            .await
            .map_err(|source| UpdateError::Io {
                path: module_dir.clone(),
                source,
            })?;
    }

    if let Some(parent) = module_dir.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|source| UpdateError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

/// Clean the module directory and check out from scratch
async fn fresh_checkout(
    client: &dyn SvnClient,
    task: &UpdateTask,
    state: &mut UpdateState,
) -> Result<UpdateOutcome, UpdateError> {
    state.advance(UpdateState::FreshCheckout, &task.module_dir());
    clean_workspace(task).await?;

    let request = task.request();
    task.log(&format!(
        "Checking out {} at revision: {} depth:{} ignoreExternals: {}",
        request.url, task.revision, request.depth, request.ignore_externals
    ));

    let mut tracker = task.tracker();
    match client
        .checkout(&request, task.auth.as_ref(), &mut tracker)
        .await
    {
        Ok(revision) => Ok(completed(task, revision, tracker)),
        Err(error) => match classify(task, "checkout", error)? {
            Recoverable::Obstructed(error) | Recoverable::Unknown(error) => {
                Ok(inconclusive(task, "checkout", error))
            }
        },
    }
}

/// `svn update` of an existing working copy
async fn update_in_place(
    client: &dyn SvnClient,
    task: &UpdateTask,
    state: &mut UpdateState,
) -> Result<UpdateOutcome, UpdateError> {
    state.advance(UpdateState::Update, &task.module_dir());
    let request = task.request();
    task.log(&format!(
        "Updating {} at revision {}",
        task.location.remote(),
        task.revision
    ));

    let mut tracker = task.tracker();
    match client
        .update(&request, task.auth.as_ref(), &mut tracker)
        .await
    {
        Ok(revision) => Ok(completed(task, revision, tracker)),
        Err(error) => recover(client, task, state, "update", error).await,
    }
}

/// Clean-and-checkout for obstructed workspaces, inconclusive otherwise
async fn recover(
    client: &dyn SvnClient,
    task: &UpdateTask,
    state: &mut UpdateState,
    operation: &str,
    error: SvnError,
) -> Result<UpdateOutcome, UpdateError> {
    match classify(task, operation, error)? {
        Recoverable::Obstructed(error) => {
            task.log(&format!(
                "svn {} of {} is obstructed by local files ({}); checking out a fresh workspace",
                operation,
                task.url(),
                error
            ));
            fresh_checkout(client, task, state).await
        }
        Recoverable::Unknown(error) => Ok(inconclusive(task, operation, error)),
    }
}

fn completed(task: &UpdateTask, revision: u64, tracker: ExternalsTracker) -> UpdateOutcome {
    tracing::info!("{} is at revision {}", task.url(), revision);
    task.log(&format!("At revision {}", revision));
    UpdateOutcome::Completed {
        revision,
        externals: tracker.into_externals(),
    }
}

/// What the module directory currently holds
enum WorkingCopy {
    Missing,
    Unreadable(String),
    At(String),
}

async fn inspect_working_copy(
    client: &dyn SvnClient,
    task: &UpdateTask,
) -> Result<WorkingCopy, UpdateError> {
    let module_dir = task.module_dir();
    if !client.is_working_copy(&module_dir) {
        return Ok(WorkingCopy::Missing);
    }

    match client
        .info(&module_dir.display().to_string(), task.auth.as_ref())
        .await
    {
        Ok(info) => Ok(WorkingCopy::At(info.url)),
        Err(error) => match classify(task, "info", error)? {
            Recoverable::Obstructed(error) | Recoverable::Unknown(error) => {
                Ok(WorkingCopy::Unreadable(error.to_string()))
            }
        },
    }
}

/// Decide between a fresh checkout and working on the existing copy
///
/// Returns the URL the working copy is on when it can be reused.
async fn decide(
    client: &dyn SvnClient,
    task: &UpdateTask,
    state: &mut UpdateState,
) -> Result<Option<String>, UpdateError> {
    state.advance(UpdateState::DecideStrategy, &task.module_dir());

    match inspect_working_copy(client, task).await? {
        WorkingCopy::Missing => {
            task.log(&format!(
                "Checking out a fresh workspace because there's no workspace at {}",
                task.module_dir().display()
            ));
            Ok(None)
        }
        WorkingCopy::Unreadable(reason) => {
            task.log(&format!(
                "Checking out a fresh workspace because the workspace could not be inspected: {}",
                reason
            ));
            Ok(None)
        }
        WorkingCopy::At(url) => Ok(Some(url)),
    }
}

fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::build_listener::RecordingListener;

    #[test]
    fn test_state_transitions() {
        use UpdateState::*;
        assert!(Initial.can_advance_to(DecideStrategy));
        assert!(DecideStrategy.can_advance_to(Switch));
        assert!(Switch.can_advance_to(FreshCheckout));
        assert!(UpdateWithRevert.can_advance_to(Update));
        assert!(FreshCheckout.can_advance_to(Done));
        assert!(Update.can_advance_to(Failed));
        assert!(!Done.can_advance_to(Failed));
        assert!(!FreshCheckout.can_advance_to(Switch));
        assert!(Done.is_terminal());
    }

    #[test]
    fn test_update_error_classification() {
        let locked = UpdateError::WorkspaceLocked {
            path: PathBuf::from("/ws"),
            message: "locked".to_string(),
        };
        let cancelled = UpdateError::Cancelled {
            path: PathBuf::from("/ws"),
        };
        let config = UpdateError::Configuration {
            message: "bad".to_string(),
        };

        assert!(locked.is_interruption() && locked.fails_build());
        assert!(cancelled.is_interruption() && !cancelled.fails_build());
        assert!(!config.is_interruption() && config.fails_build());
    }

    #[test]
    fn test_module_dir() {
        let listener = Arc::new(RecordingListener::new());
        let task = UpdateTask::new(
            ModuleLocation::new("https://svn.example.com/repo/trunk", None),
            "/ws",
            Revision::Head,
            listener.clone(),
        );
        assert_eq!(task.module_dir(), PathBuf::from("/ws/trunk"));

        let task = UpdateTask::new(
            ModuleLocation::new("https://svn.example.com/repo/trunk", Some(".".to_string())),
            "/ws",
            Revision::Head,
            listener,
        );
        assert_eq!(task.module_dir(), PathBuf::from("/ws"));
    }

    #[test]
    fn test_same_url() {
        assert!(same_url("https://h/r/trunk/", "https://h/r/trunk"));
        assert!(!same_url("https://h/r/trunk", "https://h/r/branches/x"));
    }
}
