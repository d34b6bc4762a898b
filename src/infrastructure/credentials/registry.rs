use super::credential_store::{CredentialStore, SaveListener, StoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedCredentialStore = Arc<Mutex<CredentialStore>>;

/// One lazily loaded credential store per job.
///
/// All writes to a job's store go through the returned mutex, so a job's
/// credential file is never written concurrently.
#[derive(Default)]
pub struct CredentialStoreRegistry {
    stores: Mutex<HashMap<PathBuf, SharedCredentialStore>>,
    listener: Option<Arc<dyn SaveListener>>,
}

impl CredentialStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(listener: Arc<dyn SaveListener>) -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
            listener: Some(listener),
        }
    }

    /// Store of the job rooted at `job_root`, loading it on first access
    pub async fn store_for(&self, job_root: &Path) -> Result<SharedCredentialStore, StoreError> {
        let mut stores = self.stores.lock().await;

        if let Some(store) = stores.get(job_root) {
            return Ok(Arc::clone(store));
        }

        let store = CredentialStore::load(job_root, self.listener.clone())?;
        tracing::debug!(
            "Loaded {} credential(s) for job {}",
            store.len(),
            job_root.display()
        );
        let store = Arc::new(Mutex::new(store));
        stores.insert(job_root.to_path_buf(), Arc::clone(&store));
        Ok(store)
    }

    pub async fn loaded_jobs(&self) -> usize {
        self.stores.lock().await.len()
    }
}
