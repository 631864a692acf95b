//! Publish command - publish the latest snapshots of configured sources

use std::path::Path;

use aptpub_engine::{PublishManager, PublishOptions, PublisherConfig, ReconcilePolicy, SourceFilter};

use crate::commands::{Connection, cancel_on_interrupt, timestamp};
use crate::display;
use crate::error::{CliError, Result};

/// Which configured publications to publish
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub distributions: Vec<String>,
    pub publications: Vec<String>,
    pub components: Vec<String>,
    pub architectures: Vec<String>,
}

/// Run the publish command
pub async fn run(
    connection: &Connection,
    config_path: &Path,
    selection: Selection,
    policy: ReconcilePolicy,
    only_latest: bool,
    concurrency: usize,
) -> Result<()> {
    // Configuration problems are reported before contacting the service
    let config = PublisherConfig::load(config_path)?;

    // Publication names from the command line follow --storage
    let publications = selection
        .publications
        .iter()
        .map(|name| connection.publication(name).map(|id| id.full_name()))
        .collect::<Result<Vec<_>>>()?;
    let filter = SourceFilter {
        distributions: selection.distributions,
        publications,
        components: selection.components,
        architectures: selection.architectures,
    };

    let api = connection.connect().await?;
    let mut manager = PublishManager::new(api, timestamp());
    manager
        .add_from_config(&config, &connection.storage, &filter)
        .await?;

    let options = PublishOptions {
        policy,
        only_latest,
        concurrency,
        cancel: cancel_on_interrupt(),
    };
    let summary = manager.publish_all(&options).await;
    display::print_publish_summary(&summary);

    if options.cancel.is_cancelled() {
        return Err(CliError::Interrupted);
    }
    let failed = summary.failures().count();
    if failed > 0 {
        return Err(CliError::Publish {
            failed,
            total: summary.results.len(),
        });
    }
    Ok(())
}
