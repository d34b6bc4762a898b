use super::{
    CheckoutUpdater, SwitchUpdater, UpdateUpdater, UpdateWithRevertUpdater, WorkspaceUpdater,
};
use crate::domain::entities::job_config::UpdateStrategy;
use std::sync::Arc;

/// Factory for workspace updaters
pub struct UpdaterFactory;

impl UpdaterFactory {
    /// Create the updater implementing `strategy`
    pub fn create(strategy: UpdateStrategy) -> Arc<dyn WorkspaceUpdater> {
        match strategy {
            UpdateStrategy::Checkout => Arc::new(CheckoutUpdater),
            UpdateStrategy::Update => Arc::new(UpdateUpdater),
            UpdateStrategy::Switch => Arc::new(SwitchUpdater),
            UpdateStrategy::UpdateWithRevert => Arc::new(UpdateWithRevertUpdater),
        }
    }

    /// Create an updater from a strategy name
    pub fn create_named(name: &str) -> Result<Arc<dyn WorkspaceUpdater>, String> {
        name.parse::<UpdateStrategy>().map(Self::create)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_matches_strategy() {
        for strategy in [
            UpdateStrategy::Checkout,
            UpdateStrategy::Update,
            UpdateStrategy::Switch,
            UpdateStrategy::UpdateWithRevert,
        ] {
            assert_eq!(UpdaterFactory::create(strategy).strategy(), strategy);
        }
    }

    #[test]
    fn test_create_named() {
        assert_eq!(
            UpdaterFactory::create_named("update-with-revert")
                .unwrap()
                .strategy(),
            UpdateStrategy::UpdateWithRevert
        );
        assert!(UpdaterFactory::create_named("rebase").is_err());
    }
}
