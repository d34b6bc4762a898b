use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

const CONFIG_FILE: &str = "job.yml";
const WORKSPACE_DIR: &str = "workspace";
const BUILDS_DIR: &str = "builds";

/// Storage root of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDirectory {
    root: PathBuf,
}

impl JobDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Job name, taken from the directory name
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn workspace(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn builds_dir(&self) -> PathBuf {
        self.root.join(BUILDS_DIR)
    }

    pub fn build_dir(&self, build_number: u64) -> PathBuf {
        self.builds_dir().join(build_number.to_string())
    }

    /// Build numbers with a record directory, ascending
    pub async fn build_numbers(&self) -> std::io::Result<Vec<u64>> {
        let builds_dir = self.builds_dir();
        if !builds_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut numbers = Vec::new();
        let mut entries = async_fs::read_dir(&builds_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(number) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u64>().ok())
            {
                numbers.push(number);
            }
        }

        numbers.sort_unstable();
        Ok(numbers)
    }

    /// Highest build number with a record directory
    pub async fn last_build_number(&self) -> std::io::Result<Option<u64>> {
        Ok(self.build_numbers().await?.last().copied())
    }

    pub async fn next_build_number(&self) -> std::io::Result<u64> {
        Ok(self.last_build_number().await?.map_or(1, |n| n + 1))
    }
}
