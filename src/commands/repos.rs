//! # Repos Command Implementation
//!
//! Lists every repository the configured token for a provider can see, as
//! `<git url>  <repository id>` lines.

use anyhow::Result;
use clap::Args;

use super::Context;
use workflow_sync::model::SourceControl;
use workflow_sync::store;
use workflow_sync::suggestions;

#[derive(Args, Debug)]
pub struct ReposArgs {
    /// Provider to query (github, bitbucket, gitlab).
    pub provider: SourceControl,
}

pub fn execute(args: ReposArgs, ctx: &Context) -> Result<()> {
    let store = store::for_provider(args.provider, &ctx.config).map_err(suggestions::explain)?;
    let repositories = store.git_url_to_repository_id().map_err(suggestions::explain)?;
    if repositories.is_empty() {
        println!("No repositories visible on {}", args.provider);
    }
    for (git_url, repository_id) in &repositories {
        println!("{}  {}", git_url, repository_id);
    }
    Ok(())
}
