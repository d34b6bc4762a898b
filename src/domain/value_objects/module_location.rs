use super::depth::Depth;
use super::revision::Revision;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// ジョブ内で設定された1つのリポジトリURLとチェックアウト先の組
///
/// `url@revision` 形式は構築時に一度だけ解析される。
/// 解析できたサフィックスは `url` から取り除かれるが、解析できないサフィックスは
/// そのまま残る（`url@FAKE` の `url()` は `url@FAKE` のまま）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ModuleLocationConfig", into = "ModuleLocationConfig")]
pub struct ModuleLocation {
    /// 設定された元のURL（`@revision` を含み得る）
    remote: String,
    /// `@revision` を取り除いたURL
    url: String,
    /// ワークスペース内のチェックアウト先
    local: String,
    /// 更新の深さ
    depth: Depth,
    /// svn:externals を無視するか
    ignore_externals: bool,
    /// `@` で固定されたリビジョン
    pinned: Option<Revision>,
}

/// 設定ファイル上の表現
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleLocationConfig {
    pub remote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(default)]
    pub depth: Depth,
    #[serde(default)]
    pub ignore_externals: bool,
}

impl From<ModuleLocationConfig> for ModuleLocation {
    fn from(config: ModuleLocationConfig) -> Self {
        Self::new(config.remote, config.local)
            .with_depth(config.depth)
            .with_ignore_externals(config.ignore_externals)
    }
}

impl From<ModuleLocation> for ModuleLocationConfig {
    fn from(location: ModuleLocation) -> Self {
        Self {
            remote: location.remote,
            local: Some(location.local),
            depth: location.depth,
            ignore_externals: location.ignore_externals,
        }
    }
}

impl ModuleLocation {
    /// 新しいModuleLocationを作成
    pub fn new(remote: impl Into<String>, local: Option<String>) -> Self {
        let remote = remote.into().trim().to_string();
        let (url, pinned) = Self::split_revision(&remote);

        let local = local
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| Self::default_local_dir(&url));

        Self {
            remote,
            url,
            local,
            depth: Depth::Infinity,
            ignore_externals: false,
            pinned,
        }
    }

    /// 深さを設定
    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    /// externals無視を設定
    pub fn with_ignore_externals(mut self, ignore_externals: bool) -> Self {
        self.ignore_externals = ignore_externals;
        self
    }

    /// 末尾のパス要素にある `@` 以降をリビジョンとして切り出す
    ///
    /// `svn+ssh://user@host/repo` のようにホスト部に含まれる `@` は対象外。
    fn split_revision(remote: &str) -> (String, Option<Revision>) {
        let last_segment_start = remote.rfind('/').map(|i| i + 1).unwrap_or(0);

        match remote[last_segment_start..].rfind('@') {
            Some(offset) => {
                let at = last_segment_start + offset;
                let suffix = &remote[at + 1..];
                if suffix.is_empty() {
                    return (remote.to_string(), None);
                }

                let revision = Revision::parse(suffix);
                if revision.is_valid() {
                    (remote[..at].to_string(), Some(revision))
                } else {
                    (remote.to_string(), Some(revision))
                }
            }
            None => (remote.to_string(), None),
        }
    }

    /// URLの最後のパス要素をチェックアウト先の既定値とする
    fn default_local_dir(url: &str) -> String {
        url.trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty() && !segment.contains(':'))
            .unwrap_or(".")
            .to_string()
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn ignore_externals(&self) -> bool {
        self.ignore_externals
    }

    /// `@` で固定されたリビジョン（不正な場合も含む）
    pub fn pinned_revision(&self) -> Option<&Revision> {
        self.pinned.as_ref()
    }

    /// 認証レルムの照合に使う `<scheme://host:port>` 形式の接頭辞
    pub fn realm_prefix(&self) -> Option<String> {
        let parsed = Url::parse(&self.url).ok()?;
        let host = parsed.host_str()?;
        let port = parsed.port().or_else(|| match parsed.scheme() {
            "http" => Some(80),
            "https" => Some(443),
            "svn" => Some(3690),
            "svn+ssh" => Some(22),
            _ => None,
        })?;
        Some(format!("<{}://{}:{}>", parsed.scheme(), host, port))
    }
}

impl fmt::Display for ModuleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.remote, self.local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_url() {
        let location = ModuleLocation::new("https://svn.example.com/repo/trunk", None);
        assert_eq!(location.url(), "https://svn.example.com/repo/trunk");
        assert_eq!(location.local(), "trunk");
        assert_eq!(location.pinned_revision(), None);
        assert_eq!(location.depth(), Depth::Infinity);
        assert!(!location.ignore_externals());
    }

    #[test]
    fn test_pinned_revision_is_stripped() {
        let location =
            ModuleLocation::new("https://svn.example.com/repo/trunk@1234", Some("src".into()));
        assert_eq!(location.url(), "https://svn.example.com/repo/trunk");
        assert_eq!(location.remote(), "https://svn.example.com/repo/trunk@1234");
        assert_eq!(location.local(), "src");
        assert_eq!(location.pinned_revision(), Some(&Revision::Number(1234)));
    }

    #[test]
    fn test_unparseable_suffix_keeps_url() {
        let location = ModuleLocation::new("https://svn.example.com/repo/trunk@FAKE", None);
        assert_eq!(location.url(), "https://svn.example.com/repo/trunk@FAKE");
        assert_eq!(
            location.pinned_revision(),
            Some(&Revision::Invalid("FAKE".to_string()))
        );
    }

    #[test]
    fn test_user_in_authority_is_not_a_revision() {
        let location = ModuleLocation::new("svn+ssh://builder@svn.example.com/repo/trunk", None);
        assert_eq!(
            location.url(),
            "svn+ssh://builder@svn.example.com/repo/trunk"
        );
        assert_eq!(location.pinned_revision(), None);
    }

    #[test]
    fn test_realm_prefix() {
        let location = ModuleLocation::new("https://svn.example.com/repo/trunk", None);
        assert_eq!(
            location.realm_prefix(),
            Some("<https://svn.example.com:443>".to_string())
        );

        let location = ModuleLocation::new("svn://svn.example.com:4000/repo", None);
        assert_eq!(
            location.realm_prefix(),
            Some("<svn://svn.example.com:4000>".to_string())
        );
    }

    #[test]
    fn test_yaml_roundtrip_reparses_suffix() {
        let yaml = "remote: https://svn.example.com/repo/trunk@HEAD\ndepth: files\n";
        let location: ModuleLocation = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(location.url(), "https://svn.example.com/repo/trunk");
        assert_eq!(location.pinned_revision(), Some(&Revision::Head));
        assert_eq!(location.depth(), Depth::Files);
        assert_eq!(location.local(), "trunk");
    }
}
