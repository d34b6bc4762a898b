use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 明示的なリビジョンが無い場合に、どの時点のリビジョンを使うかの規則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionPolicy {
    /// ビルドがキューに入った時刻
    QueueTime,
    /// ビルドが開始された時刻
    BuildTime,
    /// リポジトリの最新
    Head,
}

impl Default for RevisionPolicy {
    fn default() -> Self {
        Self::QueueTime
    }
}

impl fmt::Display for RevisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueTime => write!(f, "queue_time"),
            Self::BuildTime => write!(f, "build_time"),
            Self::Head => write!(f, "head"),
        }
    }
}

impl FromStr for RevisionPolicy {
    type Err = RevisionPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "queue_time" => Ok(Self::QueueTime),
            "build_time" => Ok(Self::BuildTime),
            "head" => Ok(Self::Head),
            _ => Err(RevisionPolicyError::Unknown(s.to_string())),
        }
    }
}

/// リビジョンポリシーの解析エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevisionPolicyError {
    #[error("Unknown revision policy '{0}'. Supported policies are: queue_time, build_time, head")]
    Unknown(String),
}
