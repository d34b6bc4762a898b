use super::auth_provider::{AuthenticationSource, JobAuthenticationProvider};
use super::credential::Credential;
use crate::common::error::SvnScmError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the per-job credential store
pub const CREDENTIALS_FILE: &str = "subversion.credentials";
const FORMAT_VERSION: u32 = 1;

/// Errors from loading or persisting a credential store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Persisting failed; the in-memory store is still authoritative
    #[error("Failed to persist credentials to {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential file {} is corrupt: {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Credential file {} has unsupported version {version}", .path.display())]
    UnsupportedVersion { path: PathBuf, version: u32 },
}

impl From<StoreError> for SvnScmError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Storage { path, source } => SvnScmError::storage_error_with_source(
                "Failed to persist credentials",
                Some(path),
                source,
            ),
            other => SvnScmError::serialization_error_with_source(other.to_string(), other),
        }
    }
}

/// Host hook invoked after the store has been written
pub trait SaveListener: Send + Sync {
    fn on_saved(&self, path: &Path);
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    credentials: BTreeMap<String, Credential>,
}

/// Realm → credential mapping owned by one job
pub struct CredentialStore {
    path: PathBuf,
    credentials: BTreeMap<String, Credential>,
    dirty: bool,
    listener: Option<Arc<dyn SaveListener>>,
}

impl CredentialStore {
    /// Load the store of the job rooted at `job_root`; a missing file is an empty store
    pub fn load(
        job_root: &Path,
        listener: Option<Arc<dyn SaveListener>>,
    ) -> Result<Self, StoreError> {
        let path = Self::file_path(job_root);
        let credentials = if path.is_file() {
            Self::read_file(&path)?
        } else {
            tracing::debug!("No credential file at {}", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path,
            credentials,
            dirty: false,
            listener,
        })
    }

    pub fn file_path(job_root: &Path) -> PathBuf {
        job_root.join(CREDENTIALS_FILE)
    }

    fn read_file(path: &Path) -> Result<BTreeMap<String, Credential>, StoreError> {
        let content = fs::read_to_string(path).map_err(|source| StoreError::Storage {
            path: path.to_path_buf(),
            source,
        })?;
        let file: StoreFile =
            serde_json::from_str(&content).map_err(|source| StoreError::Serialization {
                path: path.to_path_buf(),
                source,
            })?;

        if file.version > FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: file.version,
            });
        }

        Ok(file.credentials)
    }

    /// Record the credential that answered `realm`.
    ///
    /// `None` means nothing new was learned and leaves the store untouched.
    /// Returns whether the store changed.
    pub fn acknowledge_authentication(
        &mut self,
        realm: &str,
        credential: Option<Credential>,
    ) -> Result<bool, StoreError> {
        let Some(credential) = credential else {
            return Ok(false);
        };

        if self.credentials.get(realm) == Some(&credential) {
            tracing::debug!("Credential for {} unchanged", realm);
            return Ok(false);
        }

        tracing::info!("Storing {} credential for {}", credential.kind_name(), realm);
        self.credentials.insert(realm.to_string(), credential);
        self.dirty = true;
        self.save()?;
        Ok(true)
    }

    /// Forget the credential of `realm`
    pub fn remove(&mut self, realm: &str) -> Result<Option<Credential>, StoreError> {
        let removed = self.credentials.remove(realm);
        if removed.is_some() {
            self.dirty = true;
            self.save()?;
        }
        Ok(removed)
    }

    /// Write the store atomically with owner-only permissions
    pub fn save(&self) -> Result<(), StoreError> {
        let storage_error = |source| StoreError::Storage {
            path: self.path.clone(),
            source,
        };

        let file = StoreFile {
            version: FORMAT_VERSION,
            credentials: self.credentials.clone(),
        };
        let content =
            serde_json::to_string_pretty(&file).map_err(|source| StoreError::Serialization {
                path: self.path.clone(),
                source,
            })?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(storage_error)?;

        // NamedTempFile is created owner-only and removed if persisting fails
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(storage_error)?;
        temp.write_all(content.as_bytes()).map_err(storage_error)?;
        temp.as_file().sync_all().map_err(storage_error)?;
        temp.persist(&self.path)
            .map_err(|e| storage_error(e.error))?;

        if let Some(listener) = &self.listener {
            listener.on_saved(&self.path);
        }
        Ok(())
    }

    pub fn get(&self, realm: &str) -> Option<&Credential> {
        self.credentials.get(realm)
    }

    pub fn realms(&self) -> impl Iterator<Item = &str> {
        self.credentials.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Credential)> {
        self.credentials.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether the store changed since the owner last called [`mark_clean`](Self::mark_clean)
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Provider answering from this store first, then from `fallback`
    pub fn authentication_provider(
        &self,
        fallback: Option<Arc<dyn AuthenticationSource>>,
    ) -> JobAuthenticationProvider {
        JobAuthenticationProvider::new(self.credentials.clone(), fallback)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .field("realms", &self.credentials.keys().collect::<Vec<_>>())
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::credentials::credential::PasswordCredential;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const REALM: &str = "<https://svn.example.com:443> Example Repository";

    #[derive(Default)]
    struct CountingListener(AtomicUsize);

    impl SaveListener for CountingListener {
        fn on_saved(&self, _path: &Path) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn password(user: &str, pass: &str) -> Credential {
        PasswordCredential::new(user, pass).into()
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::load(temp_dir.path(), None).unwrap();
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_acknowledge_persists() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::load(temp_dir.path(), None).unwrap();

        let changed = store
            .acknowledge_authentication(REALM, Some(password("builder", "s3cret")))
            .unwrap();
        assert!(changed);
        assert!(store.is_dirty());

        let reloaded = CredentialStore::load(temp_dir.path(), None).unwrap();
        assert_eq!(reloaded.get(REALM), Some(&password("builder", "s3cret")));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_identical_acknowledgement_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let listener = Arc::new(CountingListener::default());
        let mut store = CredentialStore::load(temp_dir.path(), Some(listener.clone())).unwrap();

        store
            .acknowledge_authentication(REALM, Some(password("builder", "s3cret")))
            .unwrap();
        let after_first = fs::read_to_string(store.path()).unwrap();
        store.mark_clean();

        let changed = store
            .acknowledge_authentication(REALM, Some(password("builder", "s3cret")))
            .unwrap();
        let after_second = fs::read_to_string(store.path()).unwrap();

        assert!(!changed);
        assert!(!store.is_dirty());
        assert_eq!(after_first, after_second);
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_null_acknowledgement_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::load(temp_dir.path(), None).unwrap();
        store
            .acknowledge_authentication(REALM, Some(password("builder", "s3cret")))
            .unwrap();
        store.mark_clean();

        let changed = store.acknowledge_authentication(REALM, None).unwrap();
        assert!(!changed);
        assert!(!store.is_dirty());
        assert_eq!(store.get(REALM), Some(&password("builder", "s3cret")));
    }

    #[test]
    fn test_null_acknowledgement_on_empty_store_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::load(temp_dir.path(), None).unwrap();
        store.acknowledge_authentication(REALM, None).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::load(temp_dir.path(), None).unwrap();
        store
            .acknowledge_authentication(REALM, Some(password("a", "b")))
            .unwrap();

        assert!(store.remove(REALM).unwrap().is_some());
        assert!(store.remove(REALM).unwrap().is_none());
        let reloaded = CredentialStore::load(temp_dir.path(), None).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(CredentialStore::file_path(temp_dir.path()), "{not json").unwrap();
        let error = CredentialStore::load(temp_dir.path(), None).unwrap_err();
        assert!(matches!(error, StoreError::Serialization { .. }));
        assert!(matches!(
            SvnScmError::from(error),
            SvnScmError::SerializationError { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_storage_failure_keeps_memory_state() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let job_root = temp_dir.path().join("job");
        fs::create_dir(&job_root).unwrap();
        let mut store = CredentialStore::load(&job_root, None).unwrap();
        fs::set_permissions(&job_root, fs::Permissions::from_mode(0o500)).unwrap();

        let result = store.acknowledge_authentication(REALM, Some(password("a", "b")));
        fs::set_permissions(&job_root, fs::Permissions::from_mode(0o700)).unwrap();

        // Root ignores directory permissions
        if result.is_err() {
            assert!(matches!(result, Err(StoreError::Storage { .. })));
        }
        assert_eq!(store.get(REALM), Some(&password("a", "b")));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::load(temp_dir.path(), None).unwrap();
        store
            .acknowledge_authentication(REALM, Some(password("builder", "s3cret")))
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["credentials"][REALM]["kind"], "password");
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only_and_leaves_no_temp_files() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let mut store = CredentialStore::load(temp_dir.path(), None).unwrap();
        store
            .acknowledge_authentication(REALM, Some(password("builder", "s3cret")))
            .unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let entries: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec![CREDENTIALS_FILE.to_string()]);
    }
}
