use super::super::context::CliContext;
use crate::application::services::{TagListing, TagOrder};
use crate::domain::value_objects::module_location::ModuleLocation;
use crate::infrastructure::credentials::CredentialStoreRegistry;
use anyhow::{Context, Result};

/// List the tags (or branches) directly under a repository URL
pub struct TagsCommand {
    pub url: String,
    pub filter: Option<String>,
    pub order: TagOrder,
    pub max_tags: Option<usize>,
    pub fallback: Option<(String, String)>,
}

impl TagsCommand {
    pub fn new(
        url: String,
        filter: Option<String>,
        order: TagOrder,
        max_tags: Option<usize>,
        fallback: Option<(String, String)>,
    ) -> Self {
        Self {
            url,
            filter,
            order,
            max_tags,
            fallback,
        }
    }

    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let mut listing = TagListing::new(&self.url).with_order(self.order);
        if let Some(filter) = &self.filter {
            listing = listing.with_filter(filter)?;
        }
        if let Some(max_tags) = self.max_tags {
            listing = listing.with_max_tags(max_tags);
        }

        // Same realm lookup as a build of this URL would use
        let credentials = ctx.credential_services(ctx.local_key_source(), self.fallback.clone())?;
        let registry = CredentialStoreRegistry::new();
        let store = registry.store_for(ctx.job.root()).await?;
        let mut provider = store
            .lock()
            .await
            .authentication_provider(credentials.fallback.clone());
        let location = ModuleLocation::new(&self.url, None);
        let (_, auth) = credentials.authenticate(&mut provider, &location).await?;

        let client = ctx.client();
        let tags = listing
            .list(client.as_ref(), auth.as_ref())
            .await
            .with_context(|| format!("Failed to list {}", listing.tags_url()))?;

        for tag in tags {
            println!("{}", tag);
        }
        Ok(())
    }
}
