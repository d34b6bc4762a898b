use crate::common::error::SvnScmError;
use crate::common::result::SvnScmResult;
use crate::domain::value_objects::module_location::ModuleLocation;
use crate::domain::value_objects::revision::Revision;
use crate::domain::value_objects::revision_policy::RevisionPolicy;
use crate::domain::value_objects::svn_info::RevisionParameter;
use chrono::{DateTime, Utc};

/// ビルドで使用するリビジョンの決定
///
/// 優先順位:
/// 1. ロケーションに埋め込まれた `@revision`（不正な値も含む）
/// 2. リビジョンパラメータによる指定
/// 3. リビジョンポリシー
#[derive(Debug, Clone, Copy)]
pub struct RevisionResolver {
    queue_time: DateTime<Utc>,
    build_time: DateTime<Utc>,
}

impl RevisionResolver {
    pub fn new(queue_time: DateTime<Utc>, build_time: DateTime<Utc>) -> Self {
        Self {
            queue_time,
            build_time,
        }
    }

    /// リビジョンを解決する
    ///
    /// ポリシーが無い場合は `Revision::Unspecified` を返す。
    pub fn resolve(
        &self,
        location: &ModuleLocation,
        revision_param: Option<&RevisionParameter>,
        policy: Option<RevisionPolicy>,
    ) -> Revision {
        if let Some(pinned) = location.pinned_revision() {
            return pinned.clone();
        }

        if let Some(revision) = revision_param.and_then(|param| param.revision_for(location.url()))
        {
            return Revision::Number(revision);
        }

        match policy {
            Some(RevisionPolicy::QueueTime) => Revision::Date(self.queue_time),
            Some(RevisionPolicy::BuildTime) => Revision::Date(self.build_time),
            Some(RevisionPolicy::Head) => Revision::Head,
            None => Revision::Unspecified,
        }
    }

    /// ポリシー名から解決する。未知のポリシー名は設定エラー
    pub fn resolve_named(
        &self,
        location: &ModuleLocation,
        revision_param: Option<&RevisionParameter>,
        policy_name: Option<&str>,
    ) -> SvnScmResult<Revision> {
        let policy = policy_name.map(parse_policy).transpose()?;
        Ok(self.resolve(location, revision_param, policy))
    }
}

/// ポリシー名を解析する
pub fn parse_policy(name: &str) -> SvnScmResult<RevisionPolicy> {
    name.parse::<RevisionPolicy>()
        .map_err(|e| SvnScmError::config_error_with_source("Invalid revision policy", e))
}
