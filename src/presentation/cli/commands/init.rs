use super::super::context::CliContext;
use crate::domain::entities::job_config::{JobConfig, UpdateStrategy};
use crate::domain::value_objects::module_location::ModuleLocation;
use crate::infrastructure::filesystem::JobConfigStore;
use anyhow::Result;
use colored::Colorize;

/// Create `job.yml` for a job
pub struct InitCommand {
    pub remotes: Vec<String>,
    pub strategy: UpdateStrategy,
    pub revision_policy: Option<String>,
    pub force: bool,
}

impl InitCommand {
    pub fn new(
        remotes: Vec<String>,
        strategy: UpdateStrategy,
        revision_policy: Option<String>,
        force: bool,
    ) -> Self {
        Self {
            remotes,
            strategy,
            revision_policy,
            force,
        }
    }

    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let config_file = ctx.job.config_file();
        if config_file.exists() && !self.force {
            return Err(anyhow::anyhow!(
                "File {} already exists. Use --force to overwrite.",
                config_file.display()
            ));
        }

        let locations = self
            .remotes
            .iter()
            .map(|remote| parse_remote(remote))
            .collect();
        let mut config = JobConfig::new(locations)
            .with_name(ctx.job.name())
            .with_strategy(self.strategy);
        if let Some(policy) = &self.revision_policy {
            config = config.with_revision_policy(policy.clone());
        }

        JobConfigStore::new().save(&config_file, &config).await?;

        println!(
            "{} Created {} with {} location(s)",
            "✓".green().bold(),
            config_file.display(),
            config.locations.len()
        );
        Ok(())
    }
}

/// `URL` or `URL=LOCAL`
fn parse_remote(value: &str) -> ModuleLocation {
    match value.rsplit_once('=') {
        Some((remote, local)) if !local.is_empty() && !local.contains(':') => {
            ModuleLocation::new(remote, Some(local.to_string()))
        }
        _ => ModuleLocation::new(value, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote() {
        let location = parse_remote("https://svn.example.com/repo/trunk=src");
        assert_eq!(location.url(), "https://svn.example.com/repo/trunk");
        assert_eq!(location.local(), "src");

        let location = parse_remote("https://svn.example.com/repo/trunk@5");
        assert_eq!(location.local(), "trunk");
    }
}
