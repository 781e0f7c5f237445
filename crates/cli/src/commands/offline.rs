//! Pinned snippets and the sync bridge.

use crate::args::{MirrorCommand, OfflineCommand};
use anyhow::{Context, Result, bail};
use snipshelf_client::sync::{EditedSnippet, MirrorOutcome, SyncBridge};
use snipshelf_core::{AppConfig, OfflineStore, OfflineView, SavedSnippet, SnippetPatch};

pub async fn run(command: OfflineCommand, config: &AppConfig) -> Result<()> {
    let store = OfflineStore::new(config.database());

    match command {
        OfflineCommand::Save { record } => {
            let record: SavedSnippet = serde_json::from_str(&record).context("invalid snippet record")?;
            let saved = store.add(record).await?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        OfflineCommand::List => {
            for snippet in store.get_all().await? {
                println!("{}\t{}\t{}", snippet.id, snippet.language, snippet.title);
            }
        }
        OfflineCommand::Show { id } => match store.view(&id).await? {
            OfflineView::Saved(snippet) => println!("{}", serde_json::to_string_pretty(&snippet)?),
            OfflineView::NotSaved => println!("{id}: not saved for offline"),
        },
        OfflineCommand::Edit { patch } => {
            let patch: SnippetPatch = serde_json::from_str(&patch).context("invalid snippet patch")?;
            let id = patch.id.clone();
            match store.update(patch).await? {
                Some(snippet) => println!("{}", serde_json::to_string_pretty(&snippet)?),
                None => bail!("{id} is not saved for offline"),
            }
        }
        OfflineCommand::Remove { id } => {
            store.remove(&id).await?;
            println!("removed {id}");
        }
        OfflineCommand::Clear => {
            let removed = store.clear().await?;
            println!("removed {removed} snippets");
        }
    }
    Ok(())
}

pub async fn mirror(command: MirrorCommand, config: &AppConfig) -> Result<()> {
    let bridge = SyncBridge::new(OfflineStore::new(config.database()));

    let task = match command {
        MirrorCommand::Edit { response } => {
            let edited: EditedSnippet = serde_json::from_str(&response).context("invalid edit response")?;
            bridge.mirror_edit(&edited)
        }
        MirrorCommand::Delete { id } => bridge.mirror_delete(id),
        MirrorCommand::AccountDeleted => bridge.mirror_account_deleted(),
    };

    let op = task.op().to_string();
    // Mirror failures are diagnostics only; the command still succeeds.
    match task.outcome().await {
        MirrorOutcome::Applied => println!("{op}: mirrored"),
        MirrorOutcome::NotPinned => println!("{op}: not pinned"),
        MirrorOutcome::Failed { error, .. } => eprintln!("{op}: {error}"),
    }
    Ok(())
}
