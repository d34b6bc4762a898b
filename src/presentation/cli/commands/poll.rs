use super::super::build_listener::ConsoleListener;
use super::super::context::CliContext;
use crate::application::use_cases::PollChangesUseCase;
use crate::common::error::SvnScmError;
use crate::infrastructure::credentials::CredentialStoreRegistry;
use crate::infrastructure::filesystem::JobConfigStore;
use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;

/// Compare the last recorded revisions with the repository
pub struct PollCommand {
    pub fallback: Option<(String, String)>,
}

impl PollCommand {
    pub fn new(fallback: Option<(String, String)>) -> Self {
        Self { fallback }
    }

    /// Returns whether a new build is needed
    pub async fn execute(&self, ctx: &CliContext) -> Result<bool> {
        let config = JobConfigStore::new()
            .load(ctx.job.config_file())
            .await
            .map_err(SvnScmError::from)?;

        let credentials = ctx.credential_services(ctx.local_key_source(), self.fallback.clone())?;
        let use_case = PollChangesUseCase::new(
            ctx.client(),
            Arc::new(CredentialStoreRegistry::new()),
            credentials,
            Arc::new(ConsoleListener::new()),
        );

        let result = use_case.execute(&ctx.job, &config).await?;

        if ctx.verbose {
            for location in &result.locations {
                println!(
                    "  {} baseline={} remote={}",
                    location.url,
                    location
                        .baseline
                        .map_or_else(|| "-".to_string(), |r| r.to_string()),
                    location
                        .remote
                        .map_or_else(|| "-".to_string(), |r| r.to_string()),
                );
            }
        }

        if !result.conclusive {
            println!(
                "{} Some locations could not be queried",
                "⚠".yellow().bold()
            );
        }

        if result.changed {
            println!("{} Changes found", "✓".green().bold());
        } else {
            println!("No changes");
        }

        Ok(result.changed)
    }
}
