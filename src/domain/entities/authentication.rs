use serde::{Deserialize, Serialize};
use std::fmt;

/// 要求される認証の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// ユーザー名とパスワード
    Password,
    /// SSH（svn+ssh://）
    Ssh,
    /// SSLクライアント証明書
    SslClient,
}

impl AuthKind {
    /// URLスキームから必要な認証の種類を推定する
    pub fn for_url(url: &str) -> Self {
        if url.starts_with("svn+ssh://") {
            Self::Ssh
        } else {
            Self::Password
        }
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password => write!(f, "password"),
            Self::Ssh => write!(f, "ssh"),
            Self::SslClient => write!(f, "ssl-client"),
        }
    }
}

/// SCMクライアントに渡す、復号済みの認証情報
///
/// 平文の秘密情報を含むため、永続化やログ出力はしないこと。
#[derive(Clone, PartialEq, Eq)]
pub enum Authentication {
    Password {
        username: String,
        password: String,
    },
    Ssh {
        username: String,
        password: Option<String>,
        private_key: Option<Vec<u8>>,
        passphrase: Option<String>,
    },
    SslClient {
        certificate: Vec<u8>,
        password: String,
    },
}

impl Authentication {
    pub fn kind(&self) -> AuthKind {
        match self {
            Self::Password { .. } => AuthKind::Password,
            Self::Ssh { .. } => AuthKind::Ssh,
            Self::SslClient { .. } => AuthKind::SslClient,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Password { username, .. } | Self::Ssh { username, .. } => Some(username),
            Self::SslClient { .. } => None,
        }
    }
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Ssh {
                username,
                private_key,
                ..
            } => f
                .debug_struct("Ssh")
                .field("username", username)
                .field("has_private_key", &private_key.is_some())
                .finish_non_exhaustive(),
            Self::SslClient { certificate, .. } => f
                .debug_struct("SslClient")
                .field("certificate_len", &certificate.len())
                .finish_non_exhaustive(),
        }
    }
}
