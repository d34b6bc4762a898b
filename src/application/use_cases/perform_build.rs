use super::CredentialServices;
use crate::application::build_listener::BuildListener;
use crate::application::services::revision_resolver::RevisionResolver;
use crate::application::updaters::{UpdateOutcome, UpdateTask, UpdaterFactory};
use crate::common::result::{ResultExt, SvnScmResult};
use crate::domain::entities::external::External;
use crate::domain::entities::job_config::JobConfig;
use crate::domain::value_objects::module_location::ModuleLocation;
use crate::domain::value_objects::revision::Revision;
use crate::domain::value_objects::svn_info::{RevisionParameter, SvnInfo};
use crate::infrastructure::credentials::{CredentialStoreRegistry, StoreError};
use crate::infrastructure::filesystem::{BuildRecords, JobDirectory};
use crate::infrastructure::svn::client::SvnClient;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// ビルド要求
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// ビルド番号（Noneの場合は次の番号）
    pub build_number: Option<u64>,
    /// 過去のビルドのリビジョンを再現するためのパラメータ
    pub revision_param: Option<RevisionParameter>,
    /// ビルドがキューに入った時刻
    pub queue_time: DateTime<Utc>,
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self {
            build_number: None,
            revision_param: None,
            queue_time: Utc::now(),
        }
    }
}

/// ロケーション毎の結果
#[derive(Debug, Clone)]
pub struct LocationResult {
    pub location: ModuleLocation,
    /// 解決されたリビジョン
    pub revision: Revision,
    pub outcome: UpdateOutcome,
}

/// ビルド結果
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub build_number: u64,
    pub locations: Vec<LocationResult>,
    pub revisions: Vec<SvnInfo>,
    pub externals: Vec<External>,
}

impl BuildResult {
    /// 全てのロケーションが確定的に更新されたか
    pub fn is_conclusive(&self) -> bool {
        self.locations.iter().all(|l| l.outcome.is_completed())
    }
}

/// ワークスペースを更新し、リビジョンと externals を記録するユースケース
pub struct PerformBuildUseCase {
    client: Arc<dyn SvnClient>,
    registry: Arc<CredentialStoreRegistry>,
    credentials: CredentialServices,
    listener: Arc<dyn BuildListener>,
}

impl PerformBuildUseCase {
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

    /// ビルドを実行する
    ///
    /// 設定エラーとワークスペースのロックはビルド失敗、キャンセルは
    /// `SvnScmError::Cancelled` として返る。
    pub async fn execute(
        &self,
        job: &JobDirectory,
        config: &JobConfig,
        request: BuildRequest,
    ) -> SvnScmResult<BuildResult> {
        let build_number = match request.build_number {
            Some(number) => number,
            None => job
                .next_build_number()
                .await
                .with_filesystem_error("Failed to scan builds", Some(job.builds_dir()))?,
        };
        let resolver = RevisionResolver::new(request.queue_time, Utc::now());
        let updater = UpdaterFactory::create(config.strategy);

        tracing::info!(
            "Starting build #{} of {} with strategy {}",
            build_number,
            job.name(),
            config.strategy
        );
        self.listener.log(&format!(
            "Building #{} using the {} strategy",
            build_number, config.strategy
        ));

        let store = self
            .registry
            .store_for(job.root())
            .await?;
        let mut provider = store
            .lock()
            .await
            .authentication_provider(self.credentials.fallback.clone());

        let mut result = BuildResult {
            build_number,
            locations: Vec::with_capacity(config.locations.len()),
            revisions: Vec::new(),
            externals: Vec::new(),
        };
        let mut succeeded_realms = HashSet::new();

        for location in &config.locations {
            let revision = resolver.resolve_named(
                location,
                request.revision_param.as_ref(),
                config.revision_policy.as_deref(),
            )?;
            let (realm, auth) = self.credentials.authenticate(&mut provider, location).await?;

            let task = UpdateTask::new(
                location.clone(),
                job.workspace(),
                revision.clone(),
                Arc::clone(&self.listener),
            )
            .with_auth(auth);

            let outcome = match updater.perform(self.client.as_ref(), &task).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    if error.fails_build() {
                        self.listener.error(&error.to_string());
                    }
                    return Err(error.into());
                }
            };

            if let UpdateOutcome::Completed {
                revision: checked_out,
                externals,
            } = &outcome
            {
                succeeded_realms.insert(realm);
                result
                    .revisions
                    .push(SvnInfo::new(location.url(), *checked_out));
                result.externals.extend(externals.iter().cloned());
            }

            result.locations.push(LocationResult {
                location: location.clone(),
                revision,
                outcome,
            });
        }

        {
            let mut store = store.lock().await;
            for (realm, credential) in provider.learned() {
                if !succeeded_realms.contains(&realm) {
                    continue;
                }
                match store.acknowledge_authentication(&realm, Some(credential)) {
                    Ok(true) => self
                        .listener
                        .log(&format!("Saved credential for {}", realm)),
                    Ok(false) => {}
                    Err(error @ StoreError::Storage { .. }) => {
                        tracing::warn!("{}", error);
                        self.listener.error(&format!(
                            "{}; the credential stays in use for this build",
                            error
                        ));
                    }
                    Err(error) => return Err(error.into()),
                }
            }
        }

        let records = BuildRecords::new(job.clone());
        records
            .write_revisions(build_number, &result.revisions)
            .await?;
        records
            .write_externals(build_number, &result.externals)
            .await?;

        if !result.is_conclusive() {
            self.listener
                .log("Some locations could not be updated; the workspace state is unknown");
        }

        Ok(result)
    }
}
