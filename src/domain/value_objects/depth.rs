use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 更新の深さ（svn の `--depth`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    /// 全ての子孫
    Infinity,
    /// 直下のファイルとディレクトリ
    Immediates,
    /// 直下のファイルのみ
    Files,
    /// 対象ディレクトリのみ
    Empty,
    /// 作業コピーの既存の深さを維持する
    #[serde(rename = "unknown")]
    AsIs,
}

impl Default for Depth {
    fn default() -> Self {
        Self::Infinity
    }
}

impl Depth {
    /// `--depth` に渡す値。既存の深さを維持する場合は `None`
    pub fn to_svn_arg(self) -> Option<&'static str> {
        match self {
            Self::Infinity => Some("infinity"),
            Self::Immediates => Some("immediates"),
            Self::Files => Some("files"),
            Self::Empty => Some("empty"),
            Self::AsIs => None,
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_svn_arg().unwrap_or("unknown"))
    }
}

impl FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "infinity" => Ok(Self::Infinity),
            "immediates" => Ok(Self::Immediates),
            "files" => Ok(Self::Files),
            "empty" => Ok(Self::Empty),
            "unknown" | "as-it-is" => Ok(Self::AsIs),
            other => Err(format!("Unsupported depth '{}'", other)),
        }
    }
}
