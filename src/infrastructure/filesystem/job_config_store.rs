use crate::common::error::SvnScmError;
use crate::domain::entities::job_config::JobConfig;
use std::path::Path;
use thiserror::Error;
use tokio::fs as async_fs;
use validator::Validate;

/// Job configuration store errors
#[derive(Debug, Error)]
pub enum JobConfigStoreError {
    #[error("Job configuration not found at path: {0}")]
    NotFound(String),

    #[error("Job configuration read failed: {0}")]
    ReadFailed(String),

    #[error("Job configuration write failed: {0}")]
    WriteFailed(String),

    #[error("YAML parsing failed: {0}")]
    YamlParsingFailed(String),

    #[error("Job configuration validation failed: {0}")]
    ValidationFailed(String),
}

impl From<JobConfigStoreError> for SvnScmError {
    fn from(error: JobConfigStoreError) -> Self {
        match error {
            JobConfigStoreError::ValidationFailed(message) => {
                SvnScmError::validation_error("job.yml", message, None)
            }
            other => SvnScmError::config_error_with_source("Invalid job configuration", other),
        }
    }
}

/// Reads and writes `job.yml`
#[derive(Debug, Default, Clone)]
pub struct JobConfigStore;

impl JobConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Read, parse and validate a job configuration
    pub async fn load<P: AsRef<Path>>(&self, path: P) -> Result<JobConfig, JobConfigStoreError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(JobConfigStoreError::NotFound(path.display().to_string()));
        }

        let content = async_fs::read_to_string(path)
            .await
            .map_err(|e| JobConfigStoreError::ReadFailed(e.to_string()))?;

        let config = Self::parse(&content)?;
        tracing::debug!(
            "Loaded job configuration with {} location(s) from {}",
            config.locations.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<JobConfig, JobConfigStoreError> {
        let config: JobConfig = serde_yaml::from_str(content)
            .map_err(|e| JobConfigStoreError::YamlParsingFailed(e.to_string()))?;

        config
            .validate()
            .map_err(|e| JobConfigStoreError::ValidationFailed(e.to_string()))?;

        Ok(config)
    }

    /// Validate and write a job configuration
    pub async fn save<P: AsRef<Path>>(
        &self,
        path: P,
        config: &JobConfig,
    ) -> Result<(), JobConfigStoreError> {
        let path = path.as_ref();

        config
            .validate()
            .map_err(|e| JobConfigStoreError::ValidationFailed(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                async_fs::create_dir_all(parent)
                    .await
                    .map_err(|e| JobConfigStoreError::WriteFailed(e.to_string()))?;
            }
        }

        let yaml = serde_yaml::to_string(config)
            .map_err(|e| JobConfigStoreError::WriteFailed(e.to_string()))?;
        async_fs::write(path, yaml)
            .await
            .map_err(|e| JobConfigStoreError::WriteFailed(e.to_string()))?;

        Ok(())
    }
}
