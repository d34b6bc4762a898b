use super::super::build_listener::ConsoleListener;
use super::super::context::CliContext;
use crate::application::use_cases::{BuildRequest, PerformBuildUseCase};
use crate::common::error::SvnScmError;
use crate::domain::value_objects::svn_info::{RevisionParameter, SvnInfo};
use crate::infrastructure::credentials::{ChannelKeySource, CredentialStoreRegistry};
use crate::infrastructure::filesystem::JobConfigStore;
use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

/// Check out or update the job workspace and record the revisions
pub struct BuildCommand {
    pub build_number: Option<u64>,
    /// `URL@REV` pairs
    pub revision_params: Vec<String>,
    pub fallback: Option<(String, String)>,
}

impl BuildCommand {
    pub fn new(
        build_number: Option<u64>,
        revision_params: Vec<String>,
        fallback: Option<(String, String)>,
    ) -> Self {
        Self {
            build_number,
            revision_params,
            fallback,
        }
    }

    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let config = JobConfigStore::new()
            .load(ctx.job.config_file())
            .await
            .map_err(SvnScmError::from)?;

        let revision_param = self.revision_parameter()?;

        // Keys are served from a separate task, as they would be for a remote agent
        let (key_source, key_server) = ChannelKeySource::spawn(ctx.key_store());
        let credentials = ctx.credential_services(Arc::new(key_source), self.fallback.clone())?;

        let use_case = PerformBuildUseCase::new(
            ctx.client(),
            Arc::new(CredentialStoreRegistry::new()),
            credentials,
            Arc::new(ConsoleListener::new()),
        );

        let request = BuildRequest {
            build_number: self.build_number,
            revision_param,
            ..Default::default()
        };

        let result = use_case.execute(&ctx.job, &config, request).await;
        key_server.abort();
        let result = result?;

        if result.is_conclusive() {
            println!(
                "{} Build #{} checked out {} location(s)",
                "✓".green().bold(),
                result.build_number,
                result.revisions.len()
            );
        } else {
            println!(
                "{} Build #{} could not update every location",
                "⚠".yellow().bold(),
                result.build_number
            );
        }

        if ctx.verbose {
            for info in &result.revisions {
                println!("  {}", info);
            }
            for external in &result.externals {
                println!("  external {} -> {}@{}", external.path, external.url, external.revision);
            }
        }

        Ok(())
    }

    fn revision_parameter(&self) -> Result<Option<RevisionParameter>> {
        if self.revision_params.is_empty() {
            return Ok(None);
        }

        let revisions = self
            .revision_params
            .iter()
            .map(|value| {
                value
                    .parse::<SvnInfo>()
                    .map_err(|e| anyhow::anyhow!("{}", e))
                    .with_context(|| format!("Invalid revision parameter '{}'", value))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(RevisionParameter::new(revisions)))
    }
}
