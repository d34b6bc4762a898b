//! Legacy reversible obfuscation for passwords and passphrases.
//!
//! This only keeps secrets from being readable at a glance in the credential
//! file. It is not encryption; anyone with the file can recover the values.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Obfuscate a secret for storage
pub fn scramble(plain: &str) -> String {
    STANDARD.encode(plain.as_bytes())
}

/// Recover a secret produced by [`scramble`].
///
/// Malformed input yields `None`.
pub fn descramble(scrambled: &str) -> Option<String> {
    let bytes = STANDARD.decode(scrambled.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrambled_value_is_not_plain() {
        let scrambled = scramble("s3cret");
        assert_ne!(scrambled, "s3cret");
        assert_eq!(descramble(&scrambled).as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_empty_secret() {
        assert_eq!(scramble(""), "");
        assert_eq!(descramble("").as_deref(), Some(""));
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(descramble("not base64!"), None);
    }
}
