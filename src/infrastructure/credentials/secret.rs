use super::credential::CredentialError;
use super::restrict_permissions;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const KEY_FILE: &str = "secret.key";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Seals certificate material with the installation's secret key.
///
/// Sealed values are `base64(nonce || ciphertext)`.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Build a cipher from raw key bytes
    pub fn from_key(key: [u8; KEY_LEN]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Load `<home>/secret.key`, generating it on first use
    pub fn load_or_create(home: &Path) -> Result<Self, CredentialError> {
        let path = Self::key_path(home);

        if path.exists() {
            let bytes = fs::read(&path)?;
            let key: [u8; KEY_LEN] =
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| CredentialError::Corrupt {
                        message: format!(
                            "{} must hold exactly {} bytes",
                            path.display(),
                            KEY_LEN
                        ),
                    })?;
            return Ok(Self::from_key(key));
        }

        fs::create_dir_all(home)?;
        let key: [u8; KEY_LEN] = rand::random();
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        restrict_permissions(&path, 0o600);
        file.write_all(&key)?;
        tracing::info!("Generated secret key at {}", path.display());

        Ok(Self::from_key(key))
    }

    pub fn key_path(home: &Path) -> PathBuf {
        home.join(KEY_FILE)
    }

    pub fn seal(&self, plain: &[u8]) -> Result<String, CredentialError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plain)
            .map_err(|_| CredentialError::Cipher {
                message: "encryption failed".to_string(),
            })?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    pub fn unseal(&self, sealed: &str) -> Result<Vec<u8>, CredentialError> {
        let bytes = STANDARD
            .decode(sealed.trim())
            .map_err(|e| CredentialError::Corrupt {
                message: format!("sealed value is not base64: {}", e),
            })?;
        if bytes.len() < NONCE_LEN {
            return Err(CredentialError::Corrupt {
                message: "sealed value is truncated".to_string(),
            });
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CredentialError::Cipher {
                message: "sealed value does not match this installation's secret key".to_string(),
            })
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_seal_and_unseal() {
        let cipher = SecretCipher::from_key([7u8; KEY_LEN]);
        let sealed = cipher.seal(b"certificate bytes").unwrap();
        assert_ne!(sealed.as_bytes(), b"certificate bytes");
        assert_eq!(cipher.unseal(&sealed).unwrap(), b"certificate bytes");
    }

    #[test]
    fn test_nonce_differs_per_seal() {
        let cipher = SecretCipher::from_key([7u8; KEY_LEN]);
        assert_ne!(cipher.seal(b"x").unwrap(), cipher.seal(b"x").unwrap());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let sealed = SecretCipher::from_key([1u8; KEY_LEN]).seal(b"x").unwrap();
        let result = SecretCipher::from_key([2u8; KEY_LEN]).unseal(&sealed);
        assert!(matches!(result, Err(CredentialError::Cipher { .. })));
        assert!(matches!(
            SecretCipher::from_key([2u8; KEY_LEN]).unseal("AAAA"),
            Err(CredentialError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_key_file_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let first = SecretCipher::load_or_create(temp_dir.path()).unwrap();
        let sealed = first.seal(b"payload").unwrap();

        let second = SecretCipher::load_or_create(temp_dir.path()).unwrap();
        assert_eq!(second.unseal(&sealed).unwrap(), b"payload");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(SecretCipher::key_path(temp_dir.path()))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_short_key_file_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(SecretCipher::key_path(temp_dir.path()), b"short").unwrap();
        assert!(matches!(
            SecretCipher::load_or_create(temp_dir.path()),
            Err(CredentialError::Corrupt { .. })
        ));
    }
}
