//! Restore command - rebuild a publication from a dump document

use console::style;
use std::path::Path;

use aptpub_core::{DescriptionProvenance, DumpDocument, PublicationId};
use aptpub_engine::{EngineError, Publication, ReconcilePolicy, merge, reconcile, restore};

use crate::commands::{Connection, timestamp};
use crate::error::{CliError, Result};

/// Run the restore command
pub async fn run(
    connection: &Connection,
    restore_file: &Path,
    components: &[String],
    recreate: bool,
) -> Result<()> {
    let document = DumpDocument::load(restore_file).map_err(|e| CliError::Io {
        message: format!("{}: {}", restore_file.display(), e),
    })?;
    let id = PublicationId::parse(&document.publish, &document.storage)?;

    let api = connection.connect().await?;
    let timestamp = timestamp();

    let mut target =
        match Publication::load(api.as_ref(), &id, timestamp, &DescriptionProvenance).await {
            Ok(publication) => publication,
            Err(EngineError::NoSuchPublication { .. }) => Publication::new(id.clone(), timestamp),
            Err(e) => return Err(e.into()),
        };

    let restored = restore(api.as_ref(), &document, &mut target, components).await?;
    for name in &restored {
        println!("  {} {}", style("+").green(), name);
    }

    let resolved = merge(api.as_ref(), &target, &DescriptionProvenance).await?;
    target.set_resolved(resolved);
    let policy = ReconcilePolicy {
        recreate,
        ..ReconcilePolicy::default()
    };
    let outcome = reconcile(api.as_ref(), &mut target, &policy).await?;

    println!(
        "{} Restored {} ({})",
        style("✓").green().bold(),
        style(id.full_name()).cyan(),
        outcome
    );
    Ok(())
}
