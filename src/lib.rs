//! # svnscm - Subversion checkout engine for build jobs
//!
//! `svnscm` keeps the workspace of a build job in step with one or more
//! Subversion locations. Every build decides how to bring each location up
//! to date (fresh checkout, update, switch or revert-then-update), resolves
//! the revision to build, records the revisions and `svn:externals` that were
//! fetched, and answers polling requests by comparing those records with the
//! repository.
//!
//! ## Job layout
//!
//! ```text
//! <job>/job.yml                    job configuration
//! <job>/subversion.credentials     realm -> credential store
//! <job>/workspace/                 checked out locations
//! <job>/builds/<n>/revision.json   revisions built by build n
//! <job>/builds/<n>/svnexternals.json
//! ```
//!
//! A minimal `job.yml`:
//!
//! ```yaml
//! strategy: update
//! revision_policy: queue_time
//! locations:
//!   - remote: https://svn.example.com/repo/trunk
//!     local: src
//!   - remote: https://svn.example.com/tools/trunk@1200
//!     ignore_externals: true
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: module locations, revisions, job configuration, credentials as values
//! - [`application`]: update strategies, revision resolution, externals tracking, use cases
//! - [`infrastructure`]: the svn client, credential persistence, job directory files
//! - [`presentation`]: CLI
//! - [`common`]: shared error handling
//!
//! ## Errors
//!
//! - [`common::error::SvnScmError`]: main error type
//! - [`common::result::SvnScmResult`]: `Result<T, SvnScmError>`
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use svnscm::application::build_listener::RecordingListener;
//! use svnscm::application::use_cases::{BuildRequest, CredentialServices, PerformBuildUseCase};
//! use svnscm::infrastructure::credentials::{
//!     CredentialStoreRegistry, LocalKeySource, SecretCipher, SshKeyStore,
//! };
//! use svnscm::infrastructure::filesystem::{JobConfigStore, JobDirectory};
//! use svnscm::infrastructure::svn::SvnCliClient;
//!
//! # async fn example() -> svnscm::Result<()> {
//! let home = std::path::Path::new("/var/lib/svnscm");
//! let job = JobDirectory::new("/var/lib/svnscm/jobs/nightly");
//! let config = JobConfigStore::new().load(job.config_file()).await?;
//!
//! let credentials = CredentialServices::new(
//!     Arc::new(LocalKeySource::new(SshKeyStore::new(home))),
//!     SecretCipher::load_or_create(home)?,
//! );
//! let use_case = PerformBuildUseCase::new(
//!     Arc::new(SvnCliClient::new()),
//!     Arc::new(CredentialStoreRegistry::new()),
//!     credentials,
//!     Arc::new(RecordingListener::new()),
//! );
//!
//! let result = use_case.execute(&job, &config, BuildRequest::default()).await?;
//! println!("build #{} fetched {} externals", result.build_number, result.externals.len());
//! # Ok(())
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use crate::common::error::SvnScmError;
pub use crate::common::result::SvnScmResult as Result;
