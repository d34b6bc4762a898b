use super::switch::SwitchUpdater;
use super::{
    decide, fresh_checkout, UpdateError, UpdateOutcome, UpdateState, UpdateTask, WorkspaceUpdater,
};
use crate::domain::entities::job_config::UpdateStrategy;
use crate::infrastructure::svn::client::SvnClient;
use crate::infrastructure::svn::error_code::FailureKind;
use async_trait::async_trait;

/// Reverts local modifications, then behaves like [`SwitchUpdater`]
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateWithRevertUpdater;

#[async_trait]
impl WorkspaceUpdater for UpdateWithRevertUpdater {
    fn strategy(&self) -> UpdateStrategy {
        UpdateStrategy::UpdateWithRevert
    }

    async fn run(
        &self,
        client: &dyn SvnClient,
        task: &UpdateTask,
        state: &mut UpdateState,
    ) -> Result<UpdateOutcome, UpdateError> {
        let Some(current) = decide(client, task, state).await? else {
            return fresh_checkout(client, task, state).await;
        };

        let module_dir = task.module_dir();
        state.advance(UpdateState::UpdateWithRevert, &module_dir);
        task.log(&format!("Reverting {}", module_dir.display()));

        match client.revert(&module_dir).await {
            Ok(()) => task.log(&format!("Reverted {}", module_dir.display())),
            Err(error) if error.failure_kind() == FailureKind::Cancelled => {
                return Err(UpdateError::Cancelled { path: module_dir });
            }
            Err(error) => {
                // Reverting is best effort
                tracing::warn!("Revert of {} failed: {}", module_dir.display(), error);
                task.log(&format!(
                    "Failed to revert {}, continuing: {}",
                    module_dir.display(),
                    error
                ));
            }
        }

        SwitchUpdater::switch_or_update(client, task, state, &current).await
    }
}
