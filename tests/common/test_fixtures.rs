//! Test fixtures
//!
//! Job directories in a temp dir with a `job.yml` and the services a use case needs.

use std::sync::Arc;
use svnscm::application::build_listener::RecordingListener;
use svnscm::application::updaters::UpdateTask;
use svnscm::application::use_cases::CredentialServices;
use svnscm::domain::entities::job_config::{JobConfig, UpdateStrategy};
use svnscm::domain::value_objects::module_location::ModuleLocation;
use svnscm::domain::value_objects::revision::Revision;
use svnscm::infrastructure::credentials::{LocalKeySource, SecretCipher, SshKeyStore};
use svnscm::infrastructure::filesystem::JobDirectory;
use tempfile::TempDir;

pub const TRUNK: &str = "https://svn.example.com/repo/trunk";
pub const BRANCH: &str = "https://svn.example.com/repo/branches/1.x";
pub const LIB: &str = "https://svn.example.com/lib/trunk";

/// A job directory and an installation home inside one temp dir
pub struct JobFixture {
    pub temp_dir: TempDir,
    pub job: JobDirectory,
    pub listener: Arc<RecordingListener>,
}

impl JobFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let job = JobDirectory::new(temp_dir.path().join("jobs").join("nightly"));
        std::fs::create_dir_all(job.root()).expect("Failed to create job dir");
        Self {
            temp_dir,
            job,
            listener: Arc::new(RecordingListener::new()),
        }
    }

    pub fn home(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("home")
    }

    pub fn credentials(&self) -> CredentialServices {
        CredentialServices::new(
            Arc::new(LocalKeySource::new(SshKeyStore::new(&self.home()))),
            SecretCipher::load_or_create(&self.home()).expect("Failed to create secret"),
        )
    }

    /// Task for `location` in this job's workspace
    pub fn task(&self, location: ModuleLocation, revision: Revision) -> UpdateTask {
        UpdateTask::new(location, self.job.workspace(), revision, self.listener.clone())
    }
}

pub fn config(strategy: UpdateStrategy, locations: &[(&str, &str)]) -> JobConfig {
    JobConfig::new(
        locations
            .iter()
            .map(|(remote, local)| ModuleLocation::new(*remote, Some(local.to_string())))
            .collect(),
    )
    .with_strategy(strategy)
}
