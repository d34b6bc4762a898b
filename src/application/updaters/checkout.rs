use super::{fresh_checkout, UpdateError, UpdateOutcome, UpdateState, UpdateTask, WorkspaceUpdater};
use crate::domain::entities::job_config::UpdateStrategy;
use crate::infrastructure::svn::client::SvnClient;
use async_trait::async_trait;

/// Always wipes the module directory and checks out from scratch.
///
/// Also the fallback of every other strategy when the working copy cannot
/// be reused.
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckoutUpdater;

#[async_trait]
impl WorkspaceUpdater for CheckoutUpdater {
    fn strategy(&self) -> UpdateStrategy {
        UpdateStrategy::Checkout
    }

    async fn run(
        &self,
        client: &dyn SvnClient,
        task: &UpdateTask,
        state: &mut UpdateState,
    ) -> Result<UpdateOutcome, UpdateError> {
        fresh_checkout(client, task, state).await
    }
}
