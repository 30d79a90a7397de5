//! # Refresh Command Implementation
//!
//! Reconciles an entry with its repository and saves the merged result. An
//! unregistered repository is registered on the fly as a stub first.
//!
//! Changing `--descriptor-path` on an existing entry moves every version
//! nobody customized to the new path on this pass.

use anyhow::Result;
use clap::Args;

use super::Context;
use workflow_sync::languages::LanguageRegistry;
use workflow_sync::model::{DescriptorLanguage, EntryKind};
use workflow_sync::output::{entry_summary, report_details};
use workflow_sync::path::normalize;
use workflow_sync::reconcile::{create_stub, ReconcileOptions, Reconciler};
use workflow_sync::store;
use workflow_sync::suggestions;

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Repository git URL, e.g. git@github.com:org/repo.git
    pub git_url: String,

    /// Descriptor language for a new entry (cwl, wdl, nextflow).
    #[arg(long, default_value = "cwl")]
    pub language: DescriptorLanguage,

    /// Entry kind for a new entry (workflow, tool).
    #[arg(long, default_value = "workflow")]
    pub kind: EntryKind,

    /// Default path of the primary descriptor.
    #[arg(long, value_name = "PATH")]
    pub descriptor_path: Option<String>,

    /// Default path of the test-parameter file.
    #[arg(long, value_name = "PATH")]
    pub test_parameter_path: Option<String>,
}

pub fn execute(args: RefreshArgs, ctx: &Context) -> Result<()> {
    let (reference, existing) = ctx.find_entry(&args.git_url)?;
    let mut entry = match existing {
        Some(entry) => {
            if entry.descriptor_language != args.language || entry.kind != args.kind {
                log::debug!(
                    "{} is already a {} {}, ignoring --language/--kind",
                    entry.path(),
                    entry.descriptor_language,
                    entry.kind
                );
            }
            entry
        }
        None => create_stub(reference.clone(), args.language, args.kind),
    };
    if let Some(path) = &args.descriptor_path {
        entry.default_paths.descriptor = normalize(path);
    }
    if let Some(path) = &args.test_parameter_path {
        entry.default_paths.test_parameter = normalize(path);
    }

    let store = store::for_provider(reference.source_control, &ctx.config).map_err(suggestions::explain)?;
    let registry = LanguageRegistry::default();
    let reconciler = Reconciler::new(
        store.as_ref(),
        &ctx.state,
        &registry,
        ReconcileOptions::from(&ctx.config.reconcile),
    );
    let reconciled = reconciler.refresh(&entry).map_err(suggestions::explain)?;
    ctx.save(&reconciled.entry)?;

    print!("{}", entry_summary(&ctx.output, &reconciled.entry));
    for report in reconciled.reports.values().filter(|r| !r.valid) {
        print!("{}", report_details(report));
    }
    Ok(())
}
