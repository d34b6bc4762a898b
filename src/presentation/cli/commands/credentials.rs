use super::super::context::CliContext;
use crate::infrastructure::credentials::{
    Credential, CredentialStoreRegistry, PasswordCredential, SshPublicKeyCredential,
    SslClientCertificateCredential,
};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

/// What to do with the job's credential store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsAction {
    AddPassword {
        realm: String,
        username: String,
        password: String,
    },
    AddSsh {
        realm: String,
        username: String,
        key_file: PathBuf,
        passphrase: Option<String>,
    },
    AddCert {
        realm: String,
        certificate: PathBuf,
        password: String,
    },
    List,
    Remove {
        realm: String,
    },
}

/// Manage the credentials stored for a job
pub struct CredentialsCommand {
    pub action: CredentialsAction,
}

impl CredentialsCommand {
    pub fn new(action: CredentialsAction) -> Self {
        Self { action }
    }

    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let registry = CredentialStoreRegistry::new();
        let store = registry.store_for(ctx.job.root()).await?;
        let mut store = store.lock().await;

        let (realm, credential) = match &self.action {
            CredentialsAction::List => {
                if store.is_empty() {
                    println!("No credentials stored for {}", ctx.job.name());
                }
                for (realm, credential) in store.iter() {
                    println!("{} {}", realm.bold(), credential);
                }
                return Ok(());
            }
            CredentialsAction::Remove { realm } => {
                match store.remove(realm)? {
                    Some(credential) => {
                        if let Some(key_id) = credential.key_id() {
                            ctx.key_store().delete(key_id)?;
                        }
                        println!("{} Removed credential for {}", "✓".green().bold(), realm);
                    }
                    None => println!("No credential stored for {}", realm),
                }
                return Ok(());
            }
            CredentialsAction::AddPassword {
                realm,
                username,
                password,
            } => (
                realm,
                Credential::from(PasswordCredential::new(username.clone(), password)),
            ),
            CredentialsAction::AddSsh {
                realm,
                username,
                key_file,
                passphrase,
            } => {
                let credential = SshPublicKeyCredential::from_file(
                    username.clone(),
                    passphrase.as_deref(),
                    key_file,
                    &ctx.key_store(),
                )
                .with_context(|| format!("Failed to store key {}", key_file.display()))?;
                (realm, Credential::from(credential))
            }
            CredentialsAction::AddCert {
                realm,
                certificate,
                password,
            } => {
                let credential =
                    SslClientCertificateCredential::from_file(certificate, password, &ctx.cipher()?)
                        .with_context(|| {
                            format!("Failed to read certificate {}", certificate.display())
                        })?;
                (realm, Credential::from(credential))
            }
        };

        let kind = credential.kind_name();
        if store.acknowledge_authentication(realm, Some(credential))? {
            println!("{} Stored {} credential for {}", "✓".green().bold(), kind, realm);
        } else {
            println!("Credential for {} is unchanged", realm);
        }
        store.mark_clean();
        Ok(())
    }
}
