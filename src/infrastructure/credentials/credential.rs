use super::key_source::KeySource;
use super::key_store::SshKeyStore;
use super::scrambler;
use super::secret::SecretCipher;
use crate::common::error::SvnScmError;
use crate::domain::entities::authentication::{AuthKind, Authentication};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Errors raised while creating, reading or unlocking credentials
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Key {key_id} not found in key store")]
    KeyNotFound { key_id: String },

    #[error("Key read interrupted: the key server is no longer reachable")]
    Interrupted,

    #[error("Corrupt credential: {message}")]
    Corrupt { message: String },

    #[error("Cipher error: {message}")]
    Cipher { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl From<CredentialError> for SvnScmError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::Interrupted => SvnScmError::Cancelled,
            other => SvnScmError::credential_error_with_source("Credential unavailable", other),
        }
    }
}

/// Capabilities a credential may need to produce an [`Authentication`]
#[derive(Clone, Copy)]
pub struct CredentialContext<'a> {
    pub key_source: &'a dyn KeySource,
    pub cipher: &'a SecretCipher,
}

/// A persisted credential for one realm.
///
/// Secret fields hold their stored (scrambled or sealed) form, so equality
/// compares what would be written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    Password(PasswordCredential),
    SshPublicKey(SshPublicKeyCredential),
    SslClientCertificate(SslClientCertificateCredential),
}

impl Credential {
    /// Produce the authentication for `kind`, or `None` if this credential
    /// cannot answer that kind
    pub async fn create_authentication(
        &self,
        kind: AuthKind,
        ctx: &CredentialContext<'_>,
    ) -> Result<Option<Authentication>, CredentialError> {
        match self {
            Self::Password(c) => c.create_authentication(kind),
            Self::SshPublicKey(c) => c.create_authentication(kind, ctx.key_source).await,
            Self::SslClientCertificate(c) => c.create_authentication(kind, ctx.cipher),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Password(_) => "password",
            Self::SshPublicKey(_) => "ssh_public_key",
            Self::SslClientCertificate(_) => "ssl_client_certificate",
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Password(c) => Some(&c.username),
            Self::SshPublicKey(c) => Some(&c.username),
            Self::SslClientCertificate(_) => None,
        }
    }

    /// Key id referenced in the key store, if any
    pub fn key_id(&self) -> Option<&str> {
        match self {
            Self::SshPublicKey(c) => Some(&c.key_id),
            _ => None,
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.username() {
            Some(username) => write!(f, "{} ({})", self.kind_name(), username),
            None => write!(f, "{}", self.kind_name()),
        }
    }
}

impl From<PasswordCredential> for Credential {
    fn from(credential: PasswordCredential) -> Self {
        Self::Password(credential)
    }
}

impl From<SshPublicKeyCredential> for Credential {
    fn from(credential: SshPublicKeyCredential) -> Self {
        Self::SshPublicKey(credential)
    }
}

impl From<SslClientCertificateCredential> for Credential {
    fn from(credential: SslClientCertificateCredential) -> Self {
        Self::SslClientCertificate(credential)
    }
}

/// Username and password
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCredential {
    pub username: String,
    /// Scrambled
    pub password: String,
}

impl PasswordCredential {
    pub fn new(username: impl Into<String>, password: &str) -> Self {
        Self {
            username: username.into(),
            password: scrambler::scramble(password),
        }
    }

    pub fn password(&self) -> Result<String, CredentialError> {
        descramble_field("password", &self.password)
    }

    fn create_authentication(
        &self,
        kind: AuthKind,
    ) -> Result<Option<Authentication>, CredentialError> {
        let auth = match kind {
            AuthKind::Password => Some(Authentication::Password {
                username: self.username.clone(),
                password: self.password()?,
            }),
            AuthKind::Ssh => Some(Authentication::Ssh {
                username: self.username.clone(),
                password: Some(self.password()?),
                private_key: None,
                passphrase: None,
            }),
            AuthKind::SslClient => None,
        };
        Ok(auth)
    }
}

/// SSH private key kept in the installation key store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshPublicKeyCredential {
    pub username: String,
    /// Scrambled
    pub passphrase: String,
    pub key_id: String,
}

impl SshPublicKeyCredential {
    /// Store `key` and create a credential referring to it
    pub fn create(
        username: impl Into<String>,
        passphrase: Option<&str>,
        key: &[u8],
        store: &SshKeyStore,
    ) -> Result<Self, CredentialError> {
        let key_id = store.store(key)?;
        Ok(Self {
            username: username.into(),
            passphrase: scrambler::scramble(passphrase.unwrap_or_default()),
            key_id,
        })
    }

    /// Like [`create`](Self::create), reading the key file now
    pub fn from_file(
        username: impl Into<String>,
        passphrase: Option<&str>,
        key_file: &Path,
        store: &SshKeyStore,
    ) -> Result<Self, CredentialError> {
        let key = std::fs::read(key_file)?;
        Self::create(username, passphrase, &key, store)
    }

    pub fn passphrase(&self) -> Result<String, CredentialError> {
        descramble_field("passphrase", &self.passphrase)
    }

    async fn create_authentication(
        &self,
        kind: AuthKind,
        key_source: &dyn KeySource,
    ) -> Result<Option<Authentication>, CredentialError> {
        if kind != AuthKind::Ssh {
            return Ok(None);
        }

        let private_key = key_source.read_key(&self.key_id).await?;
        let passphrase = self.passphrase()?;
        Ok(Some(Authentication::Ssh {
            username: self.username.clone(),
            password: None,
            private_key: Some(private_key),
            passphrase: (!passphrase.is_empty()).then_some(passphrase),
        }))
    }
}

/// PKCS#12 client certificate, sealed with the installation secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslClientCertificateCredential {
    /// Sealed certificate bytes
    pub certificate: String,
    /// Scrambled
    pub password: String,
}

impl SslClientCertificateCredential {
    pub fn create(
        certificate: &[u8],
        password: &str,
        cipher: &SecretCipher,
    ) -> Result<Self, CredentialError> {
        Ok(Self {
            certificate: cipher.seal(certificate)?,
            password: scrambler::scramble(password),
        })
    }

    /// Like [`create`](Self::create), reading the certificate file now
    pub fn from_file(
        certificate_file: &Path,
        password: &str,
        cipher: &SecretCipher,
    ) -> Result<Self, CredentialError> {
        let certificate = std::fs::read(certificate_file)?;
        Self::create(&certificate, password, cipher)
    }

    fn create_authentication(
        &self,
        kind: AuthKind,
        cipher: &SecretCipher,
    ) -> Result<Option<Authentication>, CredentialError> {
        if kind != AuthKind::SslClient {
            return Ok(None);
        }

        Ok(Some(Authentication::SslClient {
            certificate: cipher.unseal(&self.certificate)?,
            password: descramble_field("password", &self.password)?,
        }))
    }
}

fn descramble_field(field: &str, value: &str) -> Result<String, CredentialError> {
    scrambler::descramble(value).ok_or_else(|| CredentialError::Corrupt {
        message: format!("{} is not a scrambled value", field),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::credentials::key_source::LocalKeySource;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        store: SshKeyStore,
        source: LocalKeySource,
        cipher: SecretCipher,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let store = SshKeyStore::new(temp_dir.path());
            Self {
                source: LocalKeySource::new(store.clone()),
                store,
                cipher: SecretCipher::from_key([3u8; 32]),
                _temp_dir: temp_dir,
            }
        }

        fn ctx(&self) -> CredentialContext<'_> {
            CredentialContext {
                key_source: &self.source,
                cipher: &self.cipher,
            }
        }
    }

    #[tokio::test]
    async fn test_password_credential_dispatch() {
        let fixture = Fixture::new();
        let credential = Credential::from(PasswordCredential::new("builder", "s3cret"));

        let password = credential
            .create_authentication(AuthKind::Password, &fixture.ctx())
            .await
            .unwrap();
        assert_eq!(
            password,
            Some(Authentication::Password {
                username: "builder".to_string(),
                password: "s3cret".to_string(),
            })
        );

        let ssh = credential
            .create_authentication(AuthKind::Ssh, &fixture.ctx())
            .await
            .unwrap();
        assert_eq!(
            ssh,
            Some(Authentication::Ssh {
                username: "builder".to_string(),
                password: Some("s3cret".to_string()),
                private_key: None,
                passphrase: None,
            })
        );

        let ssl = credential
            .create_authentication(AuthKind::SslClient, &fixture.ctx())
            .await
            .unwrap();
        assert_eq!(ssl, None);
    }

    #[tokio::test]
    async fn test_ssh_key_credential_dispatch() {
        let fixture = Fixture::new();
        let credential = Credential::from(
            SshPublicKeyCredential::create("git", Some("phrase"), b"KEY", &fixture.store).unwrap(),
        );

        let auth = credential
            .create_authentication(AuthKind::Ssh, &fixture.ctx())
            .await
            .unwrap();
        assert_eq!(
            auth,
            Some(Authentication::Ssh {
                username: "git".to_string(),
                password: None,
                private_key: Some(b"KEY".to_vec()),
                passphrase: Some("phrase".to_string()),
            })
        );

        for kind in [AuthKind::Password, AuthKind::SslClient] {
            let auth = credential
                .create_authentication(kind, &fixture.ctx())
                .await
                .unwrap();
            assert_eq!(auth, None);
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_an_error() {
        let fixture = Fixture::new();
        let credential = Credential::SshPublicKey(SshPublicKeyCredential {
            username: "git".to_string(),
            passphrase: String::new(),
            key_id: "0123456789abcdef".to_string(),
        });

        let result = credential
            .create_authentication(AuthKind::Ssh, &fixture.ctx())
            .await;
        assert!(matches!(result, Err(CredentialError::KeyNotFound { .. })));
    }

    #[tokio::test]
    async fn test_certificate_credential_dispatch() {
        let fixture = Fixture::new();
        let credential = Credential::from(
            SslClientCertificateCredential::create(b"PKCS12", "certpass", &fixture.cipher)
                .unwrap(),
        );

        let auth = credential
            .create_authentication(AuthKind::SslClient, &fixture.ctx())
            .await
            .unwrap();
        assert_eq!(
            auth,
            Some(Authentication::SslClient {
                certificate: b"PKCS12".to_vec(),
                password: "certpass".to_string(),
            })
        );

        let auth = credential
            .create_authentication(AuthKind::Password, &fixture.ctx())
            .await
            .unwrap();
        assert_eq!(auth, None);
    }

    #[test]
    fn test_serialized_form_has_kind_tag() {
        let credential = Credential::from(PasswordCredential::new("builder", "s3cret"));
        let json = serde_json::to_value(&credential).unwrap();
        assert_eq!(json["kind"], "password");
        assert_eq!(json["username"], "builder");
        assert_ne!(json["password"], "s3cret");

        let parsed: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, credential);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{"kind":"password","username":"u","password":"cA==","expires":"never"}"#;
        let parsed: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.username(), Some("u"));
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(
            PasswordCredential::new("u", "p"),
            PasswordCredential::new("u", "p")
        );
        assert_ne!(
            PasswordCredential::new("u", "p"),
            PasswordCredential::new("u", "q")
        );
    }
}
