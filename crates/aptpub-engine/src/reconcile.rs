//! Reconciliation of resolved sources against the remote publication
//!
//! Observation and planning are pure functions; [`reconcile`] re-reads the
//! remote state, plans and then issues at most a drop and a create.

use aptpub_client::{AptlyApi, CreatePublishRequest, PublishSource, UpdatePublishRequest};
use aptpub_core::ResolvedSources;

use crate::error::Result;
use crate::publication::Publication;

/// Remote state of a publication relative to its resolved sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    Absent,
    UpToDate,
    Stale,
    /// Remote still serves components that are no longer resolved
    Narrowed,
}

/// What to do about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Recreate,
    Nothing,
    /// Leave a stale remote alone
    Skip,
}

/// Result of one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    Recreated,
    UpToDate,
    /// Update was refused and recreation is disabled
    StaleUnresolved,
}

impl std::fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReconcileOutcome::Created => "created",
            ReconcileOutcome::Updated => "updated",
            ReconcileOutcome::Recreated => "recreated",
            ReconcileOutcome::UpToDate => "up to date",
            ReconcileOutcome::StaleUnresolved => "stale, not updated",
        };
        f.write_str(s)
    }
}

/// How to bring a publication up to date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Always drop and create
    pub recreate: bool,
    /// Never drop, even when an update is refused
    pub no_recreate: bool,
    /// Overwrite files in the package pool
    pub force_overwrite: bool,
    /// Generate Contents indexes
    pub publish_contents: bool,
}

/// Compare resolved sources with the published ones
pub fn observe(resolved: &ResolvedSources, remote: Option<&ResolvedSources>) -> RemoteState {
    match remote {
        None => RemoteState::Absent,
        Some(remote) if remote.same_as(resolved) => RemoteState::UpToDate,
        Some(remote) if remote.components().any(|c| !resolved.contains(c)) => {
            RemoteState::Narrowed
        }
        Some(_) => RemoteState::Stale,
    }
}

/// An update cannot remove components, so a narrowed publish is recreated
pub fn plan(state: RemoteState, policy: &ReconcilePolicy) -> Action {
    match state {
        RemoteState::Absent => Action::Create,
        _ if policy.recreate => Action::Recreate,
        RemoteState::Narrowed if policy.no_recreate => Action::Skip,
        RemoteState::Narrowed => Action::Recreate,
        RemoteState::Stale => Action::Update,
        RemoteState::UpToDate => Action::Nothing,
    }
}

/// Make the remote publication serve the resolved sources
///
/// On success the publication's remote view equals its resolved view.
pub async fn reconcile(
    api: &dyn AptlyApi,
    publication: &mut Publication,
    policy: &ReconcilePolicy,
) -> Result<ReconcileOutcome> {
    let resolved = publication.require_resolved()?.clone();
    publication.refresh_remote(api).await?;

    let state = observe(&resolved, publication.remote());
    let action = plan(state, policy);
    tracing::debug!(
        "{}: remote state {:?}, action {:?}",
        publication.full_name(),
        state,
        action
    );

    let outcome = match action {
        Action::Nothing => {
            tracing::info!("{}: publish is up to date", publication.full_name());
            ReconcileOutcome::UpToDate
        }
        Action::Skip => {
            tracing::warn!(
                "{}: publish serves components that are no longer wanted, recreation is disabled",
                publication.full_name()
            );
            return Ok(ReconcileOutcome::StaleUnresolved);
        }
        Action::Create => {
            create(api, publication, &resolved, policy).await?;
            ReconcileOutcome::Created
        }
        Action::Recreate => {
            drop_publish(api, publication).await?;
            create(api, publication, &resolved, policy).await?;
            ReconcileOutcome::Recreated
        }
        Action::Update => match update(api, publication, &resolved, policy).await {
            Ok(()) => ReconcileOutcome::Updated,
            Err(e) if e.is_not_found() && policy.no_recreate => {
                tracing::warn!(
                    "{}: cannot update publish ({}), recreation is disabled",
                    publication.full_name(),
                    e
                );
                return Ok(ReconcileOutcome::StaleUnresolved);
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    "{}: cannot update publish ({}), recreating",
                    publication.full_name(),
                    e
                );
                drop_publish(api, publication).await?;
                create(api, publication, &resolved, policy).await?;
                ReconcileOutcome::Recreated
            }
            Err(e) => return Err(e.into()),
        },
    };

    publication.set_remote(Some(resolved));
    Ok(outcome)
}

async fn create(
    api: &dyn AptlyApi,
    publication: &Publication,
    resolved: &ResolvedSources,
    policy: &ReconcilePolicy,
) -> Result<()> {
    tracing::info!(
        "{}: creating publish with {:?}",
        publication.full_name(),
        resolved
    );
    let mut request = CreatePublishRequest::snapshots(
        &publication.id().distribution,
        PublishSource::from_resolved(resolved),
    );
    request.architectures = publication.architectures().to_vec();
    request.force_overwrite = policy.force_overwrite;
    request.skip_contents = !policy.publish_contents;

    api.create_publish(publication.id(), &request).await?;
    Ok(())
}

async fn update(
    api: &dyn AptlyApi,
    publication: &Publication,
    resolved: &ResolvedSources,
    policy: &ReconcilePolicy,
) -> aptpub_client::Result<()> {
    tracing::info!(
        "{}: updating publish with {:?}",
        publication.full_name(),
        resolved
    );
    let request = UpdatePublishRequest {
        snapshots: PublishSource::from_resolved(resolved),
        force_overwrite: policy.force_overwrite,
        skip_contents: !policy.publish_contents,
    };
    api.update_publish(publication.id(), &request).await
}

async fn drop_publish(api: &dyn AptlyApi, publication: &Publication) -> Result<()> {
    if !publication.is_published() {
        return Ok(());
    }
    tracing::info!("{}: dropping publish", publication.full_name());
    api.drop_publish(publication.id(), true).await?;
    Ok(())
}
