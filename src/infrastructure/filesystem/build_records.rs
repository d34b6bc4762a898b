use super::job_directory::JobDirectory;
use crate::common::error::SvnScmError;
use crate::common::result::{ResultExt, SvnScmResult};
use crate::domain::entities::external::External;
use crate::domain::value_objects::svn_info::SvnInfo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs as async_fs;

const REVISION_FILE: &str = "revision.json";
const EXTERNALS_FILE: &str = "svnexternals.json";

/// Per-build revision and externals records
#[derive(Debug, Clone)]
pub struct BuildRecords {
    job: JobDirectory,
}

impl BuildRecords {
    pub fn new(job: JobDirectory) -> Self {
        Self { job }
    }

    pub async fn write_revisions(&self, build_number: u64, revisions: &[SvnInfo]) -> SvnScmResult<()> {
        self.write(build_number, REVISION_FILE, revisions).await
    }

    pub async fn read_revisions(&self, build_number: u64) -> SvnScmResult<Option<Vec<SvnInfo>>> {
        self.read(build_number, REVISION_FILE).await
    }

    pub async fn write_externals(&self, build_number: u64, externals: &[External]) -> SvnScmResult<()> {
        self.write(build_number, EXTERNALS_FILE, externals).await
    }

    pub async fn read_externals(&self, build_number: u64) -> SvnScmResult<Option<Vec<External>>> {
        self.read(build_number, EXTERNALS_FILE).await
    }

    /// Revision record of the most recent build that has one
    pub async fn last_revisions(&self) -> SvnScmResult<Option<(u64, Vec<SvnInfo>)>> {
        let build_numbers = self
            .job
            .build_numbers()
            .await
            .with_filesystem_error("Failed to scan builds", Some(self.job.builds_dir()))?;

        for build_number in build_numbers.into_iter().rev() {
            if let Some(revisions) = self.read_revisions(build_number).await? {
                return Ok(Some((build_number, revisions)));
            }
        }
        Ok(None)
    }

    async fn write<T: Serialize + ?Sized>(
        &self,
        build_number: u64,
        file_name: &str,
        value: &T,
    ) -> SvnScmResult<()> {
        let dir = self.job.build_dir(build_number);
        async_fs::create_dir_all(&dir)
            .await
            .with_filesystem_error("Failed to create build directory", Some(dir.clone()))?;

        let path = dir.join(file_name);
        let json = serde_json::to_string_pretty(value)?;
        async_fs::write(&path, json)
            .await
            .with_filesystem_error("Failed to write build record", Some(path))?;
        Ok(())
    }

    async fn read<T: DeserializeOwned>(
        &self,
        build_number: u64,
        file_name: &str,
    ) -> SvnScmResult<Option<T>> {
        let path = self.job.build_dir(build_number).join(file_name);
        if !path.is_file() {
            return Ok(None);
        }

        let content = async_fs::read_to_string(&path)
            .await
            .with_filesystem_error("Failed to read build record", Some(path.clone()))?;
        serde_json::from_str(&content).map(Some).map_err(|e| {
            SvnScmError::serialization_error_with_source(
                format!("Corrupt build record {}", path.display()),
                e,
            )
        })
    }
}
