use super::{
    decide, fresh_checkout, same_url, update_in_place, UpdateError, UpdateOutcome, UpdateState,
    UpdateTask, WorkspaceUpdater,
};
use crate::domain::entities::job_config::UpdateStrategy;
use crate::infrastructure::svn::client::SvnClient;
use async_trait::async_trait;

/// `svn update` when the working copy is on the configured URL, otherwise a
/// fresh checkout
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateUpdater;

#[async_trait]
impl WorkspaceUpdater for UpdateUpdater {
    fn strategy(&self) -> UpdateStrategy {
        UpdateStrategy::Update
    }

    async fn run(
        &self,
        client: &dyn SvnClient,
        task: &UpdateTask,
        state: &mut UpdateState,
    ) -> Result<UpdateOutcome, UpdateError> {
        match decide(client, task, state).await? {
            Some(current) if same_url(&current, task.url()) => {
                update_in_place(client, task, state).await
            }
            Some(current) => {
                task.log(&format!(
                    "Checking out a fresh workspace because the workspace is on {} rather than {}",
                    current,
                    task.url()
                ));
                fresh_checkout(client, task, state).await
            }
            None => fresh_checkout(client, task, state).await,
        }
    }
}
