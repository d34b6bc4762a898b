use crate::application::use_cases::CredentialServices;
use crate::infrastructure::credentials::{
    Credential, KeySource, LocalKeySource, PasswordCredential, SecretCipher, SshKeyStore,
    StaticAuthenticationSource,
};
use crate::infrastructure::filesystem::JobDirectory;
use crate::infrastructure::svn::{SvnCliClient, SvnClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Installation root holding the secret key and the SSH key store
    pub home: PathBuf,
    pub job: JobDirectory,
    pub svn_executable: String,
    pub verbose: bool,
}

impl CliContext {
    pub fn new(home: impl Into<PathBuf>, job_root: impl Into<PathBuf>, svn_executable: impl Into<String>) -> Self {
        Self {
            home: absolute(home.into()),
            job: JobDirectory::new(absolute(job_root.into())),
            svn_executable: svn_executable.into(),
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn client(&self) -> Arc<dyn SvnClient> {
        Arc::new(SvnCliClient::with_executable(&self.svn_executable))
    }

    pub fn key_store(&self) -> SshKeyStore {
        SshKeyStore::new(&self.home)
    }

    pub fn cipher(&self) -> anyhow::Result<SecretCipher> {
        Ok(SecretCipher::load_or_create(&self.home)?)
    }

    /// Credential services reading keys through `key_source`
    pub fn credential_services(
        &self,
        key_source: Arc<dyn KeySource>,
        fallback: Option<(String, String)>,
    ) -> anyhow::Result<CredentialServices> {
        let mut services = CredentialServices::new(key_source, self.cipher()?);
        if let Some((username, password)) = fallback {
            let credential: Credential = PasswordCredential::new(username, &password).into();
            services = services.with_fallback(Arc::new(StaticAuthenticationSource::new(credential)));
        }
        Ok(services)
    }

    pub fn local_key_source(&self) -> Arc<dyn KeySource> {
        Arc::new(LocalKeySource::new(self.key_store()))
    }
}

/// Anchor a relative path at the current directory so svn reports absolute paths
fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd
            .join(&path)
            .components()
            .filter(|c| !matches!(c, std::path::Component::CurDir))
            .collect(),
        Err(e) => {
            tracing::warn!("Cannot resolve {}: {}", path.display(), e);
            path
        }
    }
}
