use serde::{Deserialize, Serialize};

/// 更新中に解決された svn:externals の参照
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct External {
    /// ワークスペースからの相対パス
    pub path: String,
    /// 参照先URL
    pub url: String,
    /// 取得したリビジョン
    pub revision: u64,
}

impl External {
    pub fn new(path: impl Into<String>, url: impl Into<String>, revision: u64) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            revision,
        }
    }

    /// 必須項目が揃っているか
    pub fn is_complete(&self) -> bool {
        !self.path.is_empty() && !self.url.is_empty()
    }
}
