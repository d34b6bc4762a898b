use super::credential::CredentialError;
use super::key_store::SshKeyStore;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Capability to read private key bytes by key id.
///
/// The process that runs svn is not necessarily the one that owns the key
/// store, so credentials never read key files directly.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn read_key(&self, key_id: &str) -> Result<Vec<u8>, CredentialError>;
}

/// Reads keys straight from the local key store
#[derive(Debug, Clone)]
pub struct LocalKeySource {
    store: SshKeyStore,
}

impl LocalKeySource {
    pub fn new(store: SshKeyStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl KeySource for LocalKeySource {
    async fn read_key(&self, key_id: &str) -> Result<Vec<u8>, CredentialError> {
        self.store.read(key_id)
    }
}

/// A key read forwarded to the [`KeyServer`]
#[derive(Debug)]
pub struct KeyRequest {
    pub key_id: String,
    pub reply: oneshot::Sender<Result<Vec<u8>, CredentialError>>,
}

/// Requests keys from a [`KeyServer`] running in another task
#[derive(Debug, Clone)]
pub struct ChannelKeySource {
    sender: mpsc::Sender<KeyRequest>,
}

impl ChannelKeySource {
    pub fn new(sender: mpsc::Sender<KeyRequest>) -> Self {
        Self { sender }
    }

    /// Start a [`KeyServer`] for `store` and return a source connected to it
    pub fn spawn(store: SshKeyStore) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(8);
        let handle = tokio::spawn(KeyServer::new(store, receiver).run());
        (Self::new(sender), handle)
    }
}

#[async_trait]
impl KeySource for ChannelKeySource {
    async fn read_key(&self, key_id: &str) -> Result<Vec<u8>, CredentialError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(KeyRequest {
                key_id: key_id.to_string(),
                reply,
            })
            .await
            .map_err(|_| CredentialError::Interrupted)?;

        response.await.map_err(|_| CredentialError::Interrupted)?
    }
}

/// Serves key reads from the owning side of the channel
#[derive(Debug)]
pub struct KeyServer {
    store: SshKeyStore,
    receiver: mpsc::Receiver<KeyRequest>,
}

impl KeyServer {
    pub fn new(store: SshKeyStore, receiver: mpsc::Receiver<KeyRequest>) -> Self {
        Self { store, receiver }
    }

    /// Answer requests until every sender is dropped
    pub async fn run(mut self) {
        while let Some(request) = self.receiver.recv().await {
            tracing::debug!("Serving key {}", request.key_id);
            let result = self.store.read(&request.key_id);
            if request.reply.send(result).is_err() {
                tracing::debug!("Key requester for {} went away", request.key_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_source() {
        let temp_dir = TempDir::new().unwrap();
        let store = SshKeyStore::new(temp_dir.path());
        let key_id = store.store(b"key-bytes").unwrap();

        let source = LocalKeySource::new(store);
        assert_eq!(source.read_key(&key_id).await.unwrap(), b"key-bytes");
    }

    #[tokio::test]
    async fn test_channel_source() {
        let temp_dir = TempDir::new().unwrap();
        let store = SshKeyStore::new(temp_dir.path());
        let key_id = store.store(b"remote-key").unwrap();

        let (source, _server) = ChannelKeySource::spawn(store);
        assert_eq!(source.read_key(&key_id).await.unwrap(), b"remote-key");
        assert!(matches!(
            source.read_key("0123456789abcdef").await,
            Err(CredentialError::KeyNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_channel_is_interrupted() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let source = ChannelKeySource::new(sender);
        assert!(matches!(
            source.read_key("0123456789abcdef").await,
            Err(CredentialError::Interrupted)
        ));
    }
}
