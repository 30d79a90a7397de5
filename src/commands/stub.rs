//! # Stub and Restub Commands
//!
//! `stub` registers a repository without syncing it. `restub` throws an
//! entry's versions away so the next refresh starts from scratch; it is
//! refused for published entries and entries with frozen versions.

use anyhow::Result;
use clap::Args;

use super::Context;
use workflow_sync::model::{DescriptorLanguage, EntryKind};
use workflow_sync::output::entry_summary;
use workflow_sync::reconcile::{create_stub, restub};

#[derive(Args, Debug)]
pub struct StubArgs {
    /// Repository git URL, e.g. git@github.com:org/repo.git
    pub git_url: String,

    /// Descriptor language (cwl, wdl, nextflow).
    #[arg(long, default_value = "cwl")]
    pub language: DescriptorLanguage,

    /// Entry kind (workflow, tool).
    #[arg(long, default_value = "workflow")]
    pub kind: EntryKind,
}

#[derive(Args, Debug)]
pub struct RestubArgs {
    /// Repository git URL of a registered entry.
    pub git_url: String,
}

pub fn execute(args: StubArgs, ctx: &Context) -> Result<()> {
    let (reference, existing) = ctx.find_entry(&args.git_url)?;
    if let Some(entry) = existing {
        anyhow::bail!(
            "{} is already registered ({} versions)\n\n\
             hint: Run 'workflow-sync restub {}' to drop its versions",
            entry.path(),
            entry.versions.len(),
            args.git_url
        );
    }
    let entry = create_stub(reference, args.language, args.kind);
    ctx.save(&entry)?;
    print!("{}", entry_summary(&ctx.output, &entry));
    Ok(())
}

pub fn execute_restub(args: RestubArgs, ctx: &Context) -> Result<()> {
    let mut entry = ctx.load_entry(&args.git_url)?;
    restub(&mut entry)?;
    ctx.save(&entry)?;
    print!("{}", entry_summary(&ctx.output, &entry));
    Ok(())
}
