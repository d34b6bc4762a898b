pub mod perform_build;
pub mod poll_changes;

pub use perform_build::{BuildRequest, BuildResult, LocationResult, PerformBuildUseCase};
pub use poll_changes::{LocationPoll, PollChangesUseCase, PollResult};

use crate::common::result::SvnScmResult;
use crate::domain::entities::authentication::{AuthKind, Authentication};
use crate::domain::value_objects::module_location::ModuleLocation;
use crate::infrastructure::credentials::{
    AuthenticationSource, CredentialContext, JobAuthenticationProvider, KeySource, SecretCipher,
};
use std::sync::Arc;

/// 認証情報の解決に必要なサービス群
#[derive(Clone)]
pub struct CredentialServices {
    pub key_source: Arc<dyn KeySource>,
    pub cipher: SecretCipher,
    /// ジョブに認証情報が無い場合の問い合わせ先
    pub fallback: Option<Arc<dyn AuthenticationSource>>,
}

impl CredentialServices {
    pub fn new(key_source: Arc<dyn KeySource>, cipher: SecretCipher) -> Self {
        Self {
            key_source,
            cipher,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn AuthenticationSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// ロケーションのレルムに対する認証を解決する
    ///
    /// 戻り値のレルムは、成功後に認証情報を記録する際のキーになる。
    pub(crate) async fn authenticate(
        &self,
        provider: &mut JobAuthenticationProvider,
        location: &ModuleLocation,
    ) -> SvnScmResult<(String, Option<Authentication>)> {
        let realm = location
            .realm_prefix()
            .unwrap_or_else(|| location.url().to_string());
        let ctx = CredentialContext {
            key_source: self.key_source.as_ref(),
            cipher: &self.cipher,
        };

        let mut auth = provider
            .authenticate(&realm, AuthKind::for_url(location.url()), &ctx)
            .await?;
        // https servers may ask for a client certificate instead
        if auth.is_none() && location.url().starts_with("https://") {
            auth = provider
                .authenticate(&realm, AuthKind::SslClient, &ctx)
                .await?;
        }
        Ok((realm, auth))
    }
}
