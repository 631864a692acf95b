//! Dump command - save publications to YAML documents

use console::style;
use std::path::Path;

use aptpub_core::{DescriptionProvenance, DumpDocument};
use aptpub_engine::{Publication, PublishManager, dump};

use crate::commands::{Connection, cancel_on_interrupt, timestamp};
use crate::display;
use crate::error::Result;

/// Run the dump command
pub async fn run(
    connection: &Connection,
    publications: &[String],
    save_dir: &Path,
    prefix: &str,
) -> Result<()> {
    let api = connection.connect().await?;
    let timestamp = timestamp();
    let cancel = cancel_on_interrupt();

    let documents = if publications.is_empty() {
        let manager = PublishManager::new(api, timestamp);
        let spinner = display::spinner("Loading publications");
        let loaded = manager.load_all(&cancel).await;
        spinner.finish_and_clear();
        loaded?
            .iter()
            .map(|l| l.to_dump())
            .collect::<aptpub_engine::Result<Vec<_>>>()?
    } else {
        let bar = display::progress_bar(publications.len() as u64, "Dumping");
        let mut documents = Vec::with_capacity(publications.len());
        for name in publications {
            cancel.check()?;
            let id = connection.publication(name)?;
            bar.set_message(id.full_name());
            let publication =
                Publication::load(api.as_ref(), &id, timestamp, &DescriptionProvenance).await?;
            documents.push(dump(api.as_ref(), &publication).await?);
            bar.inc(1);
        }
        bar.finish_and_clear();
        documents
    };

    for document in &documents {
        save(document, save_dir, prefix)?;
    }
    Ok(())
}

fn save(document: &DumpDocument, save_dir: &Path, prefix: &str) -> Result<()> {
    let path = DumpDocument::file_path(save_dir, prefix, &document.publish);
    document.save(&path)?;
    println!(
        "{} {} → {}",
        style("✓").green(),
        style(&document.publish).cyan(),
        path.display()
    );
    Ok(())
}
