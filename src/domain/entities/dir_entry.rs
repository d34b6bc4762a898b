use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// リポジトリ上のノードの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Dir,
    None,
    Unknown,
}

impl NodeKind {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "file" => Self::File,
            "dir" | "directory" => Self::Dir,
            "none" => Self::None,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Dir => write!(f, "dir"),
            Self::None => write!(f, "none"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// `svn list` の1エントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: NodeKind,
    /// 最終変更リビジョン
    pub revision: u64,
    pub date: Option<DateTime<Utc>>,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: NodeKind, revision: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            revision,
            date: None,
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Dir
    }
}
