use super::{
    decide, fresh_checkout, recover, same_url, update_in_place, UpdateError, UpdateOutcome,
    UpdateState, UpdateTask, WorkspaceUpdater,
};
use crate::domain::entities::job_config::UpdateStrategy;
use crate::infrastructure::svn::client::SvnClient;
use async_trait::async_trait;

/// Reuses the working copy across URL changes with `svn switch`
#[derive(Debug, Default, Clone, Copy)]
pub struct SwitchUpdater;

impl SwitchUpdater {
    /// Switch or update a working copy currently on `current`
    pub(super) async fn switch_or_update(
        client: &dyn SvnClient,
        task: &UpdateTask,
        state: &mut UpdateState,
        current: &str,
    ) -> Result<UpdateOutcome, UpdateError> {
        if same_url(current, task.url()) {
            return update_in_place(client, task, state).await;
        }

        state.advance(UpdateState::Switch, &task.module_dir());
        task.log(&format!(
            "Switching from {} to {} using switch",
            current,
            task.url()
        ));

        let request = task.request();
        let mut tracker = task.tracker();
        match client
            .switch(&request, task.auth.as_ref(), &mut tracker)
            .await
        {
            Ok(revision) => Ok(super::completed(task, revision, tracker)),
            Err(error) => recover(client, task, state, "switch", error).await,
        }
    }
}

#[async_trait]
impl WorkspaceUpdater for SwitchUpdater {
    fn strategy(&self) -> UpdateStrategy {
        UpdateStrategy::Switch
    }

    async fn run(
        &self,
        client: &dyn SvnClient,
        task: &UpdateTask,
        state: &mut UpdateState,
    ) -> Result<UpdateOutcome, UpdateError> {
        match decide(client, task, state).await? {
            Some(current) => Self::switch_or_update(client, task, state, &current).await,
            None => fresh_checkout(client, task, state).await,
        }
    }
}
