use super::CredentialServices;
use crate::application::build_listener::BuildListener;
use crate::common::error::SvnScmError;
use crate::common::result::SvnScmResult;
use crate::domain::entities::job_config::JobConfig;
use crate::domain::value_objects::revision::Revision;
use crate::domain::value_objects::svn_info::SvnInfo;
use crate::infrastructure::credentials::CredentialStoreRegistry;
use crate::infrastructure::filesystem::{BuildRecords, JobDirectory};
use crate::infrastructure::svn::client::SvnClient;
use crate::infrastructure::svn::error_code::FailureKind;
use std::sync::Arc;

/// ロケーション毎のポーリング結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPoll {
    pub url: String,
    /// 前回ビルドのリビジョン
    pub baseline: Option<u64>,
    /// リモートの最終変更リビジョン（問い合わせ失敗時はNone）
    pub remote: Option<u64>,
}

impl LocationPoll {
    pub fn is_changed(&self) -> bool {
        match (self.baseline, self.remote) {
            (None, _) => true,
            (Some(baseline), Some(remote)) => remote > baseline,
            (Some(_), None) => false,
        }
    }
}

/// ポーリング結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    /// 新しいビルドが必要か
    pub changed: bool,
    /// 全ての問い合わせが成功したか
    pub conclusive: bool,
    pub locations: Vec<LocationPoll>,
}

/// 前回ビルドのリビジョン記録とリモートを比較するユースケース
pub struct PollChangesUseCase {
    client: Arc<dyn SvnClient>,
    registry: Arc<CredentialStoreRegistry>,
    credentials: CredentialServices,
    listener: Arc<dyn BuildListener>,
}

impl PollChangesUseCase {
    pub fn new(
        client: Arc<dyn SvnClient>,
        registry: Arc<CredentialStoreRegistry>,
        credentials: CredentialServices,
        listener: Arc<dyn BuildListener>,
    ) -> Self {
        Self {
            client,
            registry,
            credentials,
            listener,
        }
    }

    pub async fn execute(&self, job: &JobDirectory, config: &JobConfig) -> SvnScmResult<PollResult> {
        let baseline = BuildRecords::new(job.clone()).last_revisions().await?;
        let baseline_revisions = match &baseline {
            Some((build_number, revisions)) => {
                self.listener.log(&format!(
                    "Comparing against the revisions of build #{}",
                    build_number
                ));
                revisions.clone()
            }
            None => {
                self.listener
                    .log("No revision record from a previous build; a build is needed");
                Vec::new()
            }
        };

        let store = self.registry.store_for(job.root()).await?;
        let mut provider = store
            .lock()
            .await
            .authentication_provider(self.credentials.fallback.clone());

        let mut result = PollResult {
            changed: false,
            conclusive: true,
            locations: Vec::with_capacity(config.locations.len()),
        };

        for location in &config.locations {
            let url = location.url().to_string();
            let baseline = baseline_for(&baseline_revisions, &url);

            if let Some(Revision::Number(pinned)) = location.pinned_revision() {
                tracing::debug!("{} is pinned to revision {}", url, pinned);
                result.locations.push(LocationPoll {
                    url,
                    baseline,
                    remote: Some(*pinned),
                });
                continue;
            }

            let (_, auth) = self.credentials.authenticate(&mut provider, location).await?;
            let remote = match self.client.info(&url, auth.as_ref()).await {
                Ok(info) => Some(info.last_changed_revision),
                Err(error) if error.failure_kind() == FailureKind::Cancelled => {
                    return Err(SvnScmError::Cancelled);
                }
                Err(error) => {
                    tracing::error!("Polling {} failed: {}", url, error);
                    self.listener
                        .error(&format!("Failed to poll {}: {}", url, error));
                    result.conclusive = false;
                    None
                }
            };

            let poll = LocationPoll {
                url,
                baseline,
                remote,
            };
            if poll.is_changed() {
                self.listener.log(&format!(
                    "Changes found in {} (revision {} -> {})",
                    poll.url,
                    poll.baseline
                        .map_or_else(|| "none".to_string(), |r| r.to_string()),
                    poll.remote
                        .map_or_else(|| "unknown".to_string(), |r| r.to_string()),
                ));
            }
            result.locations.push(poll);
        }

        result.changed = result.locations.iter().any(LocationPoll::is_changed);
        Ok(result)
    }
}

fn baseline_for(revisions: &[SvnInfo], url: &str) -> Option<u64> {
    revisions
        .iter()
        .find(|info| info.url.trim_end_matches('/') == url.trim_end_matches('/'))
        .map(|info| info.revision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_change_rules() {
        let poll = |baseline, remote| LocationPoll {
            url: "https://svn.example.com/repo/trunk".to_string(),
            baseline,
            remote,
        };
        assert!(poll(None, Some(3)).is_changed());
        assert!(poll(Some(3), Some(4)).is_changed());
        assert!(!poll(Some(4), Some(4)).is_changed());
        assert!(!poll(Some(4), None).is_changed());
    }

    #[test]
    fn test_baseline_for_ignores_trailing_slash() {
        let revisions = vec![SvnInfo::new("https://svn.example.com/repo/trunk/", 10)];
        assert_eq!(
            baseline_for(&revisions, "https://svn.example.com/repo/trunk"),
            Some(10)
        );
        assert_eq!(baseline_for(&revisions, "https://svn.example.com/other"), None);
    }
}
