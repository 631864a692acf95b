//! Cleanup command - delete snapshots nothing refers to anymore

use aptpub_engine::PublishManager;

use crate::commands::{Connection, cancel_on_interrupt, timestamp};
use crate::display;
use crate::error::Result;

/// Run the cleanup command
pub async fn run(connection: &Connection) -> Result<()> {
    let api = connection.connect().await?;
    let manager = PublishManager::new(api, timestamp());

    let spinner = display::spinner("Cleaning up snapshots");
    let report = manager.cleanup(&cancel_on_interrupt()).await;
    spinner.finish_and_clear();

    display::print_cleanup_report(&report?, connection.dry_run);
    Ok(())
}
