pub mod build_listener;
pub mod commands;
pub mod context;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::exit;

use crate::application::services::TagOrder;
use crate::common::error::SvnScmError;
use crate::domain::entities::job_config::UpdateStrategy;
use commands::{
    BuildCommand, CredentialsAction, CredentialsCommand, InitCommand, PollCommand, TagsCommand,
};
use context::CliContext;

/// svnscm - Subversion checkout and update engine for build jobs
#[derive(Parser)]
#[command(name = "svnscm")]
#[command(about = "Check out, update and poll Subversion workspaces for build jobs")]
#[command(version)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", ",
    env!("BUILD_DATE"),
    ", ",
    env!("BUILD_TARGET"),
    ")"
))]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Installation directory holding the secret key and SSH key store
    #[arg(long, global = true, env = "SVNSCM_HOME")]
    pub home: Option<PathBuf>,

    /// Job directory (contains job.yml and the workspace)
    #[arg(short, long, global = true, env = "SVNSCM_JOB", default_value = ".")]
    pub job: PathBuf,

    /// svn executable
    #[arg(long, global = true, env = "SVNSCM_SVN", default_value = "svn")]
    pub svn: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Fallback credentials used when the job has none for a realm
#[derive(clap::Args, Debug, Clone)]
pub struct FallbackArgs {
    /// Username to try when the job has no stored credential
    #[arg(long, requires = "password")]
    pub username: Option<String>,

    /// Password for --username
    #[arg(long, env = "SVNSCM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl FallbackArgs {
    fn pair(&self) -> Option<(String, String)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create job.yml for a job
    Init {
        /// Module locations as URL or URL=LOCAL_DIR
        #[arg(required = true)]
        remotes: Vec<String>,

        /// Workspace update strategy
        #[arg(short, long, default_value = "update")]
        strategy: UpdateStrategy,

        /// Revision policy (queue_time, build_time, head)
        #[arg(long)]
        revision_policy: Option<String>,

        /// Force overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Check out or update the workspace and record revisions
    #[command(alias = "checkout")]
    Build {
        /// Build number (defaults to the next one)
        #[arg(short = 'n', long)]
        build_number: Option<u64>,

        /// Rebuild with the given revisions (URL@REV)
        #[arg(short = 'r', long = "revision-param")]
        revisions: Vec<String>,

        #[command(flatten)]
        fallback: FallbackArgs,
    },

    /// Check whether the repository changed since the last build
    Poll {
        #[command(flatten)]
        fallback: FallbackArgs,
    },

    /// List tags or branches under a URL
    Tags {
        /// Directory whose children are listed
        url: String,

        /// Regular expression the whole name must match
        #[arg(long)]
        filter: Option<String>,

        /// Sort by last changed revision, newest first
        #[arg(long, conflicts_with = "z_to_a")]
        newest_first: bool,

        /// Sort names in descending order
        #[arg(long)]
        z_to_a: bool,

        /// Maximum number of entries to print
        #[arg(long)]
        max_tags: Option<usize>,

        #[command(flatten)]
        fallback: FallbackArgs,
    },

    /// Manage credentials stored for the job
    Credentials {
        #[command(subcommand)]
        action: CredentialsSubcommand,
    },
}

#[derive(Subcommand)]
pub enum CredentialsSubcommand {
    /// Store a username and password for a realm
    AddPassword {
        realm: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "SVNSCM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Store an SSH private key for a realm
    AddSsh {
        realm: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        key_file: PathBuf,
        #[arg(long)]
        passphrase: Option<String>,
    },

    /// Store a PKCS#12 client certificate for a realm
    AddCert {
        realm: String,
        #[arg(long)]
        certificate: PathBuf,
        #[arg(long)]
        password: String,
    },

    /// List stored realms
    List,

    /// Remove the credential of a realm
    Remove { realm: String },
}

impl From<&CredentialsSubcommand> for CredentialsAction {
    fn from(command: &CredentialsSubcommand) -> Self {
        match command {
            CredentialsSubcommand::AddPassword {
                realm,
                username,
                password,
            } => Self::AddPassword {
                realm: realm.clone(),
                username: username.clone(),
                password: password.clone(),
            },
            CredentialsSubcommand::AddSsh {
                realm,
                username,
                key_file,
                passphrase,
            } => Self::AddSsh {
                realm: realm.clone(),
                username: username.clone(),
                key_file: key_file.clone(),
                passphrase: passphrase.clone(),
            },
            CredentialsSubcommand::AddCert {
                realm,
                certificate,
                password,
            } => Self::AddCert {
                realm: realm.clone(),
                certificate: certificate.clone(),
                password: password.clone(),
            },
            CredentialsSubcommand::List => Self::List,
            CredentialsSubcommand::Remove { realm } => Self::Remove {
                realm: realm.clone(),
            },
        }
    }
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

impl CliApp {
    pub fn new() -> Self {
        Self { cli: Cli::parse() }
    }

    pub fn verbose(&self) -> bool {
        self.cli.verbose
    }

    pub async fn run(self) -> Result<()> {
        colored::control::set_override(!self.cli.no_color);

        match self.handle_command().await {
            Ok(_) => Ok(()),
            Err(e) => {
                if matches!(e.downcast_ref::<SvnScmError>(), Some(SvnScmError::Cancelled)) {
                    eprintln!("{} Operation cancelled", "Aborted:".yellow().bold());
                } else {
                    eprintln!("{} {:#}", "Error:".red().bold(), e);
                }
                exit(1);
            }
        }
    }

    fn context(&self) -> Result<CliContext> {
        let home = match &self.cli.home {
            Some(home) => home.clone(),
            None => default_home()?,
        };
        Ok(CliContext::new(home, &self.cli.job, &self.cli.svn).with_verbose(self.cli.verbose))
    }

    async fn handle_command(&self) -> Result<()> {
        let ctx = self.context()?;

        match &self.cli.command {
            Commands::Init {
                remotes,
                strategy,
                revision_policy,
                force,
            } => {
                self.handle_init_command(&ctx, remotes, *strategy, revision_policy.clone(), *force)
                    .await
            }
            Commands::Build {
                build_number,
                revisions,
                fallback,
            } => {
                self.handle_build_command(&ctx, *build_number, revisions, fallback)
                    .await
            }
            Commands::Poll { fallback } => self.handle_poll_command(&ctx, fallback).await,
            Commands::Tags {
                url,
                filter,
                newest_first,
                z_to_a,
                max_tags,
                fallback,
            } => {
                let order = if *newest_first {
                    TagOrder::NewestFirst
                } else if *z_to_a {
                    TagOrder::ZToA
                } else {
                    TagOrder::AToZ
                };
                self.handle_tags_command(&ctx, url, filter.clone(), order, *max_tags, fallback)
                    .await
            }
            Commands::Credentials { action } => {
                CredentialsCommand::new(action.into()).execute(&ctx).await
            }
        }
    }

    async fn handle_init_command(
        &self,
        ctx: &CliContext,
        remotes: &[String],
        strategy: UpdateStrategy,
        revision_policy: Option<String>,
        force: bool,
    ) -> Result<()> {
        let init_cmd = InitCommand::new(remotes.to_vec(), strategy, revision_policy, force);
        init_cmd.execute(ctx).await
    }

    async fn handle_build_command(
        &self,
        ctx: &CliContext,
        build_number: Option<u64>,
        revisions: &[String],
        fallback: &FallbackArgs,
    ) -> Result<()> {
        println!(
            "{} Updating workspace of {}",
            "::".blue().bold(),
            ctx.job.name()
        );
        BuildCommand::new(build_number, revisions.to_vec(), fallback.pair())
            .execute(ctx)
            .await
    }

    async fn handle_poll_command(&self, ctx: &CliContext, fallback: &FallbackArgs) -> Result<()> {
        PollCommand::new(fallback.pair()).execute(ctx).await?;
        Ok(())
    }

    async fn handle_tags_command(
        &self,
        ctx: &CliContext,
        url: &str,
        filter: Option<String>,
        order: TagOrder,
        max_tags: Option<usize>,
        fallback: &FallbackArgs,
    ) -> Result<()> {
        TagsCommand::new(url.to_string(), filter, order, max_tags, fallback.pair())
            .execute(ctx)
            .await
    }
}

/// `$HOME/.svnscm`
fn default_home() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".svnscm"))
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory; pass --home"))
}
