//! # Default Version Command
//!
//! Points an entry at one of its versions. Entry metadata is re-derived from
//! that version.

use anyhow::Result;
use clap::Args;

use super::Context;
use workflow_sync::policy::set_default_version;
use workflow_sync::suggestions;

#[derive(Args, Debug)]
pub struct DefaultVersionArgs {
    /// Repository git URL of a registered entry.
    pub git_url: String,

    /// Name of the version to make the default.
    pub version: String,
}

pub fn execute(args: DefaultVersionArgs, ctx: &Context) -> Result<()> {
    let mut entry = ctx.load_entry(&args.git_url)?;
    if let Err(e) = set_default_version(&mut entry, &args.version) {
        log::debug!("{}", e);
        let names: Vec<&str> = entry.versions.keys().map(String::as_str).collect();
        return Err(suggestions::unknown_version(&args.version, &names));
    }
    ctx.save(&entry)?;
    println!("Default version of {} is now {}", entry.path(), args.version);
    Ok(())
}
