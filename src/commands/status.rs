//! # Status Command Implementation
//!
//! Read-only view of a registered entry: one line per version plus the
//! diagnostics of every invalid version.

use anyhow::Result;
use clap::Args;

use super::Context;
use workflow_sync::model::ValidationReport;
use workflow_sync::output::{entry_summary, report_details};
use workflow_sync::policy::can_publish;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Repository git URL of a registered entry.
    pub git_url: String,

    /// Print the stored entry as JSON instead.
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: StatusArgs, ctx: &Context) -> Result<()> {
    let entry = ctx.load_entry(&args.git_url)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    print!("{}", entry_summary(&ctx.output, &entry));
    for version in entry.versions.values().filter(|v| !v.valid) {
        let report = ValidationReport {
            version: version.name.clone(),
            valid: version.valid,
            validations: version.validations.clone(),
        };
        print!("{}", report_details(&report));
    }
    if let Some(description) = &entry.metadata.description {
        println!("description: {}", description.lines().next().unwrap_or_default());
    }
    println!("publishable: {}", if can_publish(&entry) { "yes" } else { "no" });
    Ok(())
}
