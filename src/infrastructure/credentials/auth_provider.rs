use super::credential::{Credential, CredentialContext, CredentialError};
use crate::domain::entities::authentication::{AuthKind, Authentication};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Lower-priority credentials consulted when the job has none for a realm
#[async_trait]
pub trait AuthenticationSource: Send + Sync {
    async fn credential_for(&self, realm: &str, kind: AuthKind) -> Option<Credential>;
}

/// Fallback that answers every realm with the same credential
#[derive(Debug, Clone)]
pub struct StaticAuthenticationSource {
    credential: Credential,
}

impl StaticAuthenticationSource {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl AuthenticationSource for StaticAuthenticationSource {
    async fn credential_for(&self, _realm: &str, _kind: AuthKind) -> Option<Credential> {
        Some(self.credential.clone())
    }
}

/// Where an answered credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOrigin {
    Job,
    Fallback,
}

/// Answers authentication requests for one job.
///
/// Realms are matched exactly first, then by their `<scheme://host:port>`
/// prefix. Every answer is remembered so the caller can acknowledge
/// fallback credentials once the operation succeeded.
pub struct JobAuthenticationProvider {
    credentials: BTreeMap<String, Credential>,
    fallback: Option<Arc<dyn AuthenticationSource>>,
    answered: HashMap<String, (Credential, CredentialOrigin)>,
}

impl JobAuthenticationProvider {
    pub fn new(
        credentials: BTreeMap<String, Credential>,
        fallback: Option<Arc<dyn AuthenticationSource>>,
    ) -> Self {
        Self {
            credentials,
            fallback,
            answered: HashMap::new(),
        }
    }

    /// Job credential for `realm`
    pub fn lookup(&self, realm: &str) -> Option<&Credential> {
        if let Some(credential) = self.credentials.get(realm) {
            return Some(credential);
        }

        let prefix = realm_prefix(realm)?;
        self.credentials
            .iter()
            .find(|(key, _)| key.starts_with(prefix))
            .map(|(_, credential)| credential)
    }

    pub async fn authenticate(
        &mut self,
        realm: &str,
        kind: AuthKind,
        ctx: &CredentialContext<'_>,
    ) -> Result<Option<Authentication>, CredentialError> {
        if let Some(credential) = self.lookup(realm).cloned() {
            if let Some(auth) = credential.create_authentication(kind, ctx).await? {
                tracing::debug!("Using job credential for {}", realm);
                self.answered
                    .insert(realm.to_string(), (credential, CredentialOrigin::Job));
                return Ok(Some(auth));
            }
        }

        let Some(fallback) = self.fallback.clone() else {
            return Ok(None);
        };
        let Some(credential) = fallback.credential_for(realm, kind).await else {
            return Ok(None);
        };

        let auth = credential.create_authentication(kind, ctx).await?;
        if auth.is_some() {
            tracing::debug!("Using fallback credential for {}", realm);
            self.answered
                .insert(realm.to_string(), (credential, CredentialOrigin::Fallback));
        }
        Ok(auth)
    }

    /// Credentials taken from the fallback, to be acknowledged into the job store
    pub fn learned(&self) -> Vec<(String, Credential)> {
        let mut learned: Vec<_> = self
            .answered
            .iter()
            .filter(|(_, (_, origin))| *origin == CredentialOrigin::Fallback)
            .map(|(realm, (credential, _))| (realm.clone(), credential.clone()))
            .collect();
        learned.sort_by(|a, b| a.0.cmp(&b.0));
        learned
    }

    pub fn origin(&self, realm: &str) -> Option<CredentialOrigin> {
        self.answered.get(realm).map(|(_, origin)| *origin)
    }
}

/// `<scheme://host:port>` part of a realm string
fn realm_prefix(realm: &str) -> Option<&str> {
    if !realm.starts_with('<') {
        return None;
    }
    realm.find('>').map(|end| &realm[..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::credentials::credential::PasswordCredential;
    use crate::infrastructure::credentials::key_source::LocalKeySource;
    use crate::infrastructure::credentials::key_store::SshKeyStore;
    use crate::infrastructure::credentials::secret::SecretCipher;
    use tempfile::TempDir;

    const REALM: &str = "<https://svn.example.com:443> Example Repository";

    fn password(user: &str, pass: &str) -> Credential {
        PasswordCredential::new(user, pass).into()
    }

    #[test]
    fn test_lookup_by_prefix() {
        let mut credentials = BTreeMap::new();
        credentials.insert(REALM.to_string(), password("builder", "s3cret"));
        let provider = JobAuthenticationProvider::new(credentials, None);

        assert!(provider.lookup(REALM).is_some());
        assert!(provider.lookup("<https://svn.example.com:443>").is_some());
        assert!(provider.lookup("<https://other.example.com:443>").is_none());
        assert!(provider.lookup("plain").is_none());
    }

    #[tokio::test]
    async fn test_job_credential_wins_over_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let source = LocalKeySource::new(SshKeyStore::new(temp_dir.path()));
        let cipher = SecretCipher::from_key([0u8; 32]);
        let ctx = CredentialContext {
            key_source: &source,
            cipher: &cipher,
        };

        let mut credentials = BTreeMap::new();
        credentials.insert(REALM.to_string(), password("job", "p"));
        let fallback = Arc::new(StaticAuthenticationSource::new(password("global", "g")));
        let mut provider = JobAuthenticationProvider::new(credentials, Some(fallback));

        let auth = provider
            .authenticate(REALM, AuthKind::Password, &ctx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(auth.username(), Some("job"));
        assert_eq!(provider.origin(REALM), Some(CredentialOrigin::Job));
        assert!(provider.learned().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_credential_is_learned() {
        let temp_dir = TempDir::new().unwrap();
        let source = LocalKeySource::new(SshKeyStore::new(temp_dir.path()));
        let cipher = SecretCipher::from_key([0u8; 32]);
        let ctx = CredentialContext {
            key_source: &source,
            cipher: &cipher,
        };

        let fallback = Arc::new(StaticAuthenticationSource::new(password("global", "g")));
        let mut provider = JobAuthenticationProvider::new(BTreeMap::new(), Some(fallback));

        let auth = provider
            .authenticate(REALM, AuthKind::Ssh, &ctx)
            .await
            .unwrap();
        assert!(matches!(auth, Some(Authentication::Ssh { .. })));
        assert_eq!(
            provider.learned(),
            vec![(REALM.to_string(), password("global", "g"))]
        );
    }

    #[tokio::test]
    async fn test_no_credential() {
        let temp_dir = TempDir::new().unwrap();
        let source = LocalKeySource::new(SshKeyStore::new(temp_dir.path()));
        let cipher = SecretCipher::from_key([0u8; 32]);
        let ctx = CredentialContext {
            key_source: &source,
            cipher: &cipher,
        };

        let mut provider = JobAuthenticationProvider::new(BTreeMap::new(), None);
        let auth = provider
            .authenticate(REALM, AuthKind::Password, &ctx)
            .await
            .unwrap();
        assert!(auth.is_none());
    }
}
