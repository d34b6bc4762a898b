pub mod auth_provider;
pub mod credential;
pub mod credential_store;
pub mod key_source;
pub mod key_store;
pub mod registry;
pub mod scrambler;
pub mod secret;

pub use auth_provider::{AuthenticationSource, JobAuthenticationProvider, StaticAuthenticationSource};
pub use credential::{
    Credential, CredentialContext, CredentialError, PasswordCredential, SshPublicKeyCredential,
    SslClientCertificateCredential,
};
pub use credential_store::{CredentialStore, SaveListener, StoreError};
pub use key_source::{ChannelKeySource, KeySource, LocalKeySource};
pub use key_store::SshKeyStore;
pub use registry::CredentialStoreRegistry;
pub use secret::SecretCipher;

use std::path::Path;

/// Restrict `path` to the owner; failures are logged and otherwise ignored
pub(crate) fn restrict_permissions(path: &Path, mode: u32) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)) {
            tracing::warn!(
                "Failed to set permissions {:o} on {}: {}",
                mode,
                path.display(),
                e
            );
        }
    }
    #[cfg(not(unix))]
    {
        let _ = mode;
        tracing::debug!("Owner-only permissions not applied to {}", path.display());
    }
}
