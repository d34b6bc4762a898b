use super::credential::CredentialError;
use super::restrict_permissions;
use rand::Rng;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const KEY_DIR: &str = "subversion-credentials";
const MAX_ID_ATTEMPTS: usize = 16;

/// Private key storage shared by all jobs of an installation
#[derive(Debug, Clone)]
pub struct SshKeyStore {
    directory: PathBuf,
}

impl SshKeyStore {
    pub fn new(home: &Path) -> Self {
        Self {
            directory: home.join(KEY_DIR),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Store key bytes under a fresh identifier and return it
    pub fn store(&self, key: &[u8]) -> Result<String, CredentialError> {
        self.ensure_directory()?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let key_id = generate_key_id();
            let path = self.directory.join(&key_id);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!("Key id {} already taken, regenerating", key_id);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            restrict_permissions(&path, 0o600);
            file.write_all(key)?;
            return Ok(key_id);
        }

        Err(CredentialError::Corrupt {
            message: format!(
                "could not allocate a key id in {}",
                self.directory.display()
            ),
        })
    }

    pub fn read(&self, key_id: &str) -> Result<Vec<u8>, CredentialError> {
        let path = self.key_path(key_id)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CredentialError::KeyNotFound {
                key_id: key_id.to_string(),
            },
            _ => e.into(),
        })
    }

    pub fn delete(&self, key_id: &str) -> Result<(), CredentialError> {
        let path = self.key_path(key_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn key_path(&self, key_id: &str) -> Result<PathBuf, CredentialError> {
        if !is_key_id(key_id) {
            return Err(CredentialError::Corrupt {
                message: format!("'{}' is not a key id", key_id),
            });
        }
        Ok(self.directory.join(key_id))
    }

    fn ensure_directory(&self) -> Result<(), CredentialError> {
        if !self.directory.is_dir() {
            fs::create_dir_all(&self.directory)?;
            restrict_permissions(&self.directory, 0o700);
        }
        Ok(())
    }
}

fn generate_key_id() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

fn is_key_id(value: &str) -> bool {
    value.len() == 16 && value.chars().all(|c| c.is_ascii_hexdigit())
}
