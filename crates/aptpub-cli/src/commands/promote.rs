//! Promote command - copy components or packages between publications

use aptpub_client::AptlyApi;
use aptpub_core::{DescriptionProvenance, PublicationId};
use aptpub_engine::{
    EngineError, PromoteRequest, Publication, PublishManager, ReconcilePolicy, diff_report,
    promote,
};

use crate::commands::{Connection, cancel_on_interrupt, timestamp};
use crate::display;
use crate::error::{CliError, Result};

/// Run the promote command
///
/// A target containing `{0}`, `{1}`, ... turns the source into a pattern
/// and promotes every matching publication.
pub async fn run(
    connection: &Connection,
    source: &str,
    target: &str,
    components: &[String],
    packages: &[String],
    diff: bool,
    policy: ReconcilePolicy,
) -> Result<()> {
    let api = connection.connect().await?;
    let timestamp = timestamp();

    let pairs = if target.contains('{') {
        let manager = PublishManager::new(api.clone(), timestamp);
        let pairs = manager.find_promotions(source, target).await?;
        if pairs.is_empty() {
            return Err(CliError::usage_with_help(
                format!("No publication matches '{}'", source),
                "the pattern must match the whole publication name",
            ));
        }
        pairs
    } else {
        vec![(connection.publication(source)?, connection.publication(target)?)]
    };

    let cancel = cancel_on_interrupt();
    for (source, target) in pairs {
        cancel.check()?;
        if diff {
            show_diff(api.as_ref(), &source, &target, components, timestamp).await?;
            continue;
        }

        let request = PromoteRequest {
            source: source.clone(),
            target: target.clone(),
            components: components.to_vec(),
            packages: packages.to_vec(),
            policy,
        };
        let outcome = promote(api.as_ref(), &request, timestamp, &DescriptionProvenance).await?;
        display::print_promote_outcome(&source.full_name(), &target.full_name(), outcome);
    }

    Ok(())
}

async fn show_diff(
    api: &dyn AptlyApi,
    source: &PublicationId,
    target: &PublicationId,
    components: &[String],
    timestamp: i64,
) -> Result<()> {
    let source_publication =
        Publication::load(api, source, timestamp, &DescriptionProvenance).await?;
    let target_publication =
        match Publication::load(api, target, timestamp, &DescriptionProvenance).await {
            Ok(publication) => publication,
            Err(EngineError::NoSuchPublication { .. }) => {
                Publication::new(target.clone(), timestamp)
            }
            Err(e) => return Err(e.into()),
        };

    let reports = diff_report(api, &source_publication, &target_publication, components).await?;
    display::print_diff_report(&source.full_name(), &target.full_name(), &reports);
    Ok(())
}
