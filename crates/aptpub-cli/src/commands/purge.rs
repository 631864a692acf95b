//! Purge command - keep only the latest version of every package

use std::path::Path;

use aptpub_core::DescriptionProvenance;
use aptpub_engine::{
    Publication, PublisherConfig, PurgeOptions, ReconcilePolicy, purge, reconcile,
};

use crate::commands::{Connection, cancel_on_interrupt, timestamp};
use crate::display;
use crate::error::Result;

/// Run the purge command
pub async fn run(
    connection: &Connection,
    config_path: &Path,
    publications: &[String],
    components: &[String],
    hard: bool,
    policy: ReconcilePolicy,
) -> Result<()> {
    // Source repositories are only needed to delete packages
    let config = if hard {
        Some(PublisherConfig::load(config_path)?)
    } else {
        None
    };
    let ids = publications
        .iter()
        .map(|name| connection.publication(name))
        .collect::<Result<Vec<_>>>()?;

    let api = connection.connect().await?;
    let timestamp = timestamp();
    let cancel = cancel_on_interrupt();

    for id in ids {
        cancel.check()?;
        let mut publication =
            Publication::load(api.as_ref(), &id, timestamp, &DescriptionProvenance).await?;

        let mut source_repos: Vec<String> = Vec::new();
        if let Some(config) = &config {
            let selected: Vec<&str> = if components.is_empty() {
                publication.desired().components().collect()
            } else {
                components.iter().map(String::as_str).collect()
            };
            for component in selected {
                for repo in config.sources_for(&id, component, &connection.storage) {
                    if !source_repos.contains(&repo) {
                        source_repos.push(repo);
                    }
                }
            }
            if source_repos.is_empty() {
                tracing::warn!(
                    "{}: no configured repository feeds the purged components",
                    id
                );
            }
        }

        let options = PurgeOptions { hard, source_repos };
        let report = purge(api.as_ref(), &mut publication, components, &options).await?;
        display::print_purge_report(&id.full_name(), &report);

        if report.changed() {
            cancel.check()?;
            let outcome = reconcile(api.as_ref(), &mut publication, &policy).await?;
            tracing::info!("{}: {}", id, outcome);
        }
    }

    Ok(())
}
