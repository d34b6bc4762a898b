use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ビルド時点のURLとリビジョンのスナップショット
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SvnInfo {
    /// リポジトリURL
    pub url: String,
    /// リビジョン番号
    pub revision: u64,
}

impl SvnInfo {
    pub fn new(url: impl Into<String>, revision: u64) -> Self {
        Self {
            url: url.into(),
            revision,
        }
    }

    fn same_url(&self, url: &str) -> bool {
        self.url.trim_end_matches('/') == url.trim_end_matches('/')
    }
}

impl fmt::Display for SvnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.url, self.revision)
    }
}

impl FromStr for SvnInfo {
    type Err = String;

    /// `URL@REV` 形式を解析する
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (url, revision) = s
            .rsplit_once('@')
            .ok_or_else(|| format!("Expected URL@REVISION, got '{}'", s))?;
        let revision = revision
            .parse::<u64>()
            .map_err(|_| format!("Invalid revision number in '{}'", s))?;
        if url.is_empty() {
            return Err(format!("Missing URL in '{}'", s));
        }
        Ok(Self::new(url, revision))
    }
}

/// 過去のビルドのリビジョンを指定して再ビルドするためのパラメータ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionParameter {
    revisions: Vec<SvnInfo>,
}

impl RevisionParameter {
    pub fn new(revisions: Vec<SvnInfo>) -> Self {
        Self { revisions }
    }

    /// URLに対応するリビジョンを探す（末尾の `/` は無視）
    pub fn revision_for(&self, url: &str) -> Option<u64> {
        self.revisions
            .iter()
            .find(|info| info.same_url(url))
            .map(|info| info.revision)
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn revisions(&self) -> &[SvnInfo] {
        &self.revisions
    }
}
