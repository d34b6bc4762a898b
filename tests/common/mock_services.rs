//! Mock services for testing
//!
//! [`FakeSvnClient`] plays back scripted results instead of running svn, and
//! keeps just enough working copy state for the update strategies to decide
//! between checkout, update and switch.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use svnscm::domain::entities::authentication::Authentication;
use svnscm::domain::entities::dir_entry::{DirEntry, NodeKind};
use svnscm::infrastructure::svn::client::{
    EventAction, NodeInfo, OperationRequest, SvnClient, SvnError, UpdateEvent, UpdateEventHandler,
};

/// Scripted result of one tree operation
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Succeed at this revision
    At(u64),
    /// Fail with this svn error output
    Fail(String),
}

/// An external fetched by every successful tree operation
#[derive(Debug, Clone)]
pub struct ScriptedExternal {
    /// Relative to the module directory
    pub path: String,
    pub url: String,
    pub revision: u64,
    pub kind: NodeKind,
}

/// Recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: &'static str,
    pub target: String,
    /// `-r` argument, if any
    pub revision: Option<String>,
    pub username: Option<String>,
}

#[derive(Default)]
struct State {
    scripts: HashMap<&'static str, VecDeque<Scripted>>,
    working_copies: HashMap<PathBuf, String>,
    remote_revisions: HashMap<String, u64>,
    externals: Vec<ScriptedExternal>,
    listings: HashMap<String, Vec<DirEntry>>,
    revert_failure: Option<String>,
    info_failure: Option<String>,
    calls: Vec<Call>,
}

/// Scripted [`SvnClient`]
#[derive(Default)]
pub struct FakeSvnClient {
    state: Mutex<State>,
}

impl FakeSvnClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for `operation` (checkout, update or switch).
    /// Unscripted operations succeed at revision 1.
    pub fn script(&self, operation: &'static str, result: Scripted) -> &Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(operation)
            .or_default()
            .push_back(result);
        self
    }

    /// Pretend `path` is a working copy of `url`
    pub fn with_working_copy(&self, path: &Path, url: &str) -> &Self {
        std::fs::create_dir_all(path.join(".svn")).unwrap();
        self.state
            .lock()
            .unwrap()
            .working_copies
            .insert(path.to_path_buf(), url.to_string());
        self
    }

    pub fn with_remote_revision(&self, url: &str, last_changed: u64) -> &Self {
        self.state
            .lock()
            .unwrap()
            .remote_revisions
            .insert(url.to_string(), last_changed);
        self
    }

    pub fn with_external(&self, path: &str, url: &str, revision: u64, kind: NodeKind) -> &Self {
        self.state.lock().unwrap().externals.push(ScriptedExternal {
            path: path.to_string(),
            url: url.to_string(),
            revision,
            kind,
        });
        self
    }

    pub fn with_listing(&self, url: &str, entries: Vec<DirEntry>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .listings
            .insert(url.to_string(), entries);
        self
    }

    pub fn fail_revert(&self, output: &str) -> &Self {
        self.state.lock().unwrap().revert_failure = Some(output.to_string());
        self
    }

    pub fn fail_info(&self, output: &str) -> &Self {
        self.state.lock().unwrap().info_failure = Some(output.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.calls().into_iter().map(|call| call.operation).collect()
    }

    pub fn working_copy_url(&self, path: &Path) -> Option<String> {
        self.state.lock().unwrap().working_copies.get(path).cloned()
    }

    fn record(&self, operation: &'static str, target: String, revision: Option<String>, auth: Option<&Authentication>) {
        let username = auth.and_then(|auth| match auth {
            Authentication::Password { username, .. } | Authentication::Ssh { username, .. } => {
                Some(username.clone())
            }
            Authentication::SslClient { .. } => None,
        });
        self.state.lock().unwrap().calls.push(Call {
            operation,
            target,
            revision,
            username,
        });
    }

    fn tree_operation(
        &self,
        operation: &'static str,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError> {
        self.record(
            operation,
            request.url.clone(),
            request.revision.to_svn_arg(),
            auth,
        );

        let scripted = self
            .state
            .lock()
            .unwrap()
            .scripts
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Scripted::At(1));

        let revision = match scripted {
            Scripted::At(revision) => revision,
            Scripted::Fail(output) => return Err(SvnError::operation_failed(operation, output)),
        };

        std::fs::create_dir_all(request.path.join(".svn"))?;
        let externals = {
            let mut state = self.state.lock().unwrap();
            state
                .working_copies
                .insert(request.path.clone(), request.url.clone());
            state.externals.clone()
        };

        events.handle_event(&UpdateEvent::new(EventAction::Add, request.path.join("README")));
        if !request.ignore_externals {
            for external in externals {
                events.handle_event(
                    &UpdateEvent::new(EventAction::UpdateExternal, request.path.join(&external.path))
                        .with_url(external.url)
                        .with_revision(external.revision)
                        .with_node_kind(external.kind),
                );
            }
        }
        events.handle_event(
            &UpdateEvent::new(EventAction::UpdateCompleted, &request.path).with_revision(revision),
        );
        Ok(revision)
    }
}

#[async_trait]
impl SvnClient for FakeSvnClient {
    async fn checkout(
        &self,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError> {
        self.tree_operation("checkout", request, auth, events)
    }

    async fn update(
        &self,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError> {
        self.tree_operation("update", request, auth, events)
    }

    async fn switch(
        &self,
        request: &OperationRequest,
        auth: Option<&Authentication>,
        events: &mut dyn UpdateEventHandler,
    ) -> Result<u64, SvnError> {
        self.tree_operation("switch", request, auth, events)
    }

    async fn revert(&self, path: &Path) -> Result<(), SvnError> {
        self.record("revert", path.display().to_string(), None, None);
        match self.state.lock().unwrap().revert_failure.clone() {
            Some(output) => Err(SvnError::operation_failed("revert", output)),
            None => Ok(()),
        }
    }

    async fn info(
        &self,
        target: &str,
        auth: Option<&Authentication>,
    ) -> Result<NodeInfo, SvnError> {
        self.record("info", target.to_string(), None, auth);
        let state = self.state.lock().unwrap();

        if let Some(output) = &state.info_failure {
            return Err(SvnError::operation_failed("info", output.clone()));
        }
        if let Some(url) = state.working_copies.get(Path::new(target)) {
            return Ok(NodeInfo {
                url: url.clone(),
                revision: 1,
                last_changed_revision: 1,
                kind: NodeKind::Dir,
            });
        }
        match state.remote_revisions.get(target) {
            Some(revision) => Ok(NodeInfo {
                url: target.to_string(),
                revision: *revision,
                last_changed_revision: *revision,
                kind: NodeKind::Dir,
            }),
            None => Err(SvnError::operation_failed(
                "info",
                format!("svn: E170000: URL '{}' non-existent in revision", target),
            )),
        }
    }

    async fn list(
        &self,
        url: &str,
        auth: Option<&Authentication>,
    ) -> Result<Vec<DirEntry>, SvnError> {
        self.record("list", url.to_string(), None, auth);
        Ok(self
            .state
            .lock()
            .unwrap()
            .listings
            .get(url)
            .cloned()
            .unwrap_or_default())
    }

    fn is_working_copy(&self, path: &Path) -> bool {
        self.state.lock().unwrap().working_copies.contains_key(path)
    }
}
