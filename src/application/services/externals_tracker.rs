use crate::application::build_listener::BuildListener;
use crate::domain::entities::dir_entry::NodeKind;
use crate::domain::entities::external::External;
use crate::infrastructure::svn::client::{EventAction, UpdateEvent, UpdateEventHandler};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// 更新イベントから svn:externals を収集し、ビルドログへ出力する
pub struct ExternalsTracker {
    module_dir: PathBuf,
    local: String,
    listener: Arc<dyn BuildListener>,
    externals: Vec<External>,
}

impl ExternalsTracker {
    /// `module_dir` はモジュールの作業コピー、`local` はワークスペース内の相対パス
    pub fn new(module_dir: impl Into<PathBuf>, local: impl Into<String>, listener: Arc<dyn BuildListener>) -> Self {
        Self {
            module_dir: module_dir.into(),
            local: local.into(),
            listener,
            externals: Vec::new(),
        }
    }

    pub fn externals(&self) -> &[External] {
        &self.externals
    }

    pub fn into_externals(self) -> Vec<External> {
        self.externals
    }

    /// ワークスペースからの相対パス（`/` 区切り）
    fn workspace_path(&self, path: &Path) -> String {
        let path = without_cur_dir(path);
        let module_dir = without_cur_dir(&self.module_dir);
        let relative = if let Ok(stripped) = path.strip_prefix(&module_dir) {
            stripped.to_path_buf()
        } else if path.is_absolute() {
            pathdiff::diff_paths(&path, &module_dir).unwrap_or(path)
        } else {
            path
        };
        let relative = relative.to_string_lossy().replace('\\', "/");

        match (self.local.trim_end_matches('/'), relative.as_str()) {
            ("" | ".", rel) => rel.to_string(),
            (local, "" | ".") => local.to_string(),
            (local, rel) => format!("{}/{}", local, rel),
        }
    }

    fn record_external(&mut self, event: &UpdateEvent) {
        let path = self.workspace_path(&event.path);

        let Some(url) = event.url.clone() else {
            tracing::warn!("External at {} reported without a URL", path);
            return;
        };

        if event.expected_action != EventAction::UpdateExternal {
            self.listener
                .log(&format!("Fetching '{}' at {} into '{}'", url, revision_label(event.revision), path));
        }

        if event.node_kind == NodeKind::File {
            tracing::warn!("File external at {}", path);
            self.listener.log(&format!(
                "WARNING: {} is a file external. File externals require working copy format 1.6 or later and may not work with every update strategy.",
                path
            ));
        }

        let Some(revision) = event.revision else {
            tracing::debug!("External {} has no revision yet", path);
            return;
        };

        let external = External::new(path, url, revision);
        match self.externals.iter_mut().find(|e| e.path == external.path) {
            Some(existing) => *existing = external,
            None => self.externals.push(external),
        }
    }
}

/// `./workspace/src` と `workspace/src` を同一視する
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn revision_label(revision: Option<u64>) -> String {
    revision.map_or_else(|| "HEAD".to_string(), |r| r.to_string())
}

impl UpdateEventHandler for ExternalsTracker {
    fn handle_event(&mut self, event: &UpdateEvent) {
        match event.action {
            EventAction::UpdateExternal => self.record_external(event),
            EventAction::UpdateCompleted => {
                tracing::debug!("Update of {} completed", self.module_dir.display());
            }
            action => {
                if let Some(letter) = action.status_letter() {
                    let path = self.workspace_path(&event.path);
                    self.listener.log(&format!("{}         {}", letter, path));
                }
            }
        }
    }
}
