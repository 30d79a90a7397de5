//! # Publish Command Implementation

use anyhow::Result;
use clap::Args;

use super::Context;
use workflow_sync::policy::publish;

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Repository git URL of a registered entry.
    pub git_url: String,

    /// Withdraw the entry instead.
    #[arg(long)]
    pub unpublish: bool,
}

pub fn execute(args: PublishArgs, ctx: &Context) -> Result<()> {
    let mut entry = ctx.load_entry(&args.git_url)?;
    publish(&mut entry, !args.unpublish).map_err(|e| {
        anyhow::anyhow!(
            "{}\n\nhint: Run 'workflow-sync status {}' to see why no version is valid",
            e,
            args.git_url
        )
    })?;
    ctx.save(&entry)?;
    let state = if entry.is_published { "published" } else { "unpublished" };
    println!("{} is {}", entry.path(), state);
    Ok(())
}
