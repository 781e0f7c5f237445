//! Mirrors successful server mutations into the offline store.
//!
//! A mutation has two phases. The authoritative result is returned to the
//! caller as soon as the server call succeeds. The mirror into the pinned
//! copy then runs as a detached [`MirrorTask`]; its failure is logged and
//! reported through [`MirrorOutcome`], never through the primary result.
//!
//! The bridge never pins or unpins on its own: a snippet that was not saved
//! for offline stays unsaved.

use serde::{Deserialize, Serialize};
use snipshelf_core::store::snippets::double_option;
use snipshelf_core::{Error, OfflineStore, SnippetPatch};
use std::fmt;
use std::future::Future;
use tokio::task::JoinHandle;

/// Fields returned by a successful edit call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedSnippet {
    pub id: String,
    pub title: String,
    pub code: String,
    pub language: String,
    /// `Some(None)` is an explicit `null` from the server and clears the
    /// pinned value; `None` means the field was absent.
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub note: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<Option<String>>,
}

impl From<&EditedSnippet> for SnippetPatch {
    fn from(edited: &EditedSnippet) -> Self {
        SnippetPatch {
            id: edited.id.clone(),
            title: Some(edited.title.clone()),
            code: Some(edited.code.clone()),
            language: Some(edited.language.clone()),
            description: edited.description.clone(),
            note: edited.note.clone(),
            creator_name: edited.creator_name.clone(),
            tags: None,
        }
    }
}

/// A mirror operation, kept so a failed one can be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOp {
    Edit(SnippetPatch),
    Delete(String),
    AccountDeleted,
}

impl fmt::Display for MirrorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorOp::Edit(patch) => write!(f, "edit {}", patch.id),
            MirrorOp::Delete(id) => write!(f, "delete {id}"),
            MirrorOp::AccountDeleted => write!(f, "account deletion"),
        }
    }
}

/// How a mirror ended.
#[derive(Debug)]
pub enum MirrorOutcome {
    /// The offline copy now reflects the server.
    Applied,
    /// Nothing was pinned for the id; nothing was written.
    NotPinned,
    /// The mirror failed. The primary mutation is unaffected.
    Failed { op: MirrorOp, error: Error },
}

impl MirrorOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, MirrorOutcome::Failed { .. })
    }
}

/// A detached mirror running in the background.
///
/// Dropping the task does not cancel it.
pub struct MirrorTask {
    op: MirrorOp,
    handle: JoinHandle<MirrorOutcome>,
}

impl MirrorTask {
    pub fn op(&self) -> &MirrorOp {
        &self.op
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the mirror to finish.
    pub async fn outcome(self) -> MirrorOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let error = Error::SyncMirror(format!("{}: task aborted: {e}", self.op));
                tracing::warn!("{}", error);
                MirrorOutcome::Failed { op: self.op, error }
            }
        }
    }
}

/// Best-effort mirror from server mutations into pinned records.
#[derive(Debug, Clone)]
pub struct SyncBridge {
    store: OfflineStore,
}

impl SyncBridge {
    pub fn new(store: OfflineStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &OfflineStore {
        &self.store
    }

    /// Run the authoritative edit and, on success, start mirroring its
    /// result.
    ///
    /// The returned snippet is the server's result, independent of whether
    /// the mirror later succeeds. A failed mutation starts no mirror.
    pub async fn commit_edit<F, E>(&self, mutation: F) -> Result<(EditedSnippet, MirrorTask), E>
    where
        F: Future<Output = Result<EditedSnippet, E>>,
    {
        let edited = mutation.await?;
        let task = self.mirror_edit(&edited);
        Ok((edited, task))
    }

    /// Update the pinned copy of an edited snippet, if there is one.
    pub fn mirror_edit(&self, edited: &EditedSnippet) -> MirrorTask {
        self.spawn(MirrorOp::Edit(SnippetPatch::from(edited)))
    }

    /// Drop the pinned copy of a snippet deleted on the server.
    pub fn mirror_delete(&self, id: impl Into<String>) -> MirrorTask {
        self.spawn(MirrorOp::Delete(id.into()))
    }

    /// Drop every pinned copy after the account is deleted.
    pub fn mirror_account_deleted(&self) -> MirrorTask {
        self.spawn(MirrorOp::AccountDeleted)
    }

    /// Run a previously failed operation again.
    pub fn retry(&self, op: MirrorOp) -> MirrorTask {
        tracing::debug!("retrying mirror: {}", op);
        self.spawn(op)
    }

    fn spawn(&self, op: MirrorOp) -> MirrorTask {
        let store = self.store.clone();
        let task_op = op.clone();
        let handle = tokio::spawn(async move { apply(&store, task_op).await });
        MirrorTask { op, handle }
    }
}

async fn apply(store: &OfflineStore, op: MirrorOp) -> MirrorOutcome {
    let result = match &op {
        MirrorOp::Edit(patch) => store.update(patch.clone()).await.map(|updated| updated.is_some()),
        MirrorOp::Delete(id) => match store.contains(id).await {
            Ok(true) => store.remove(id).await.map(|()| true),
            Ok(false) => Ok(false),
            Err(e) => Err(e),
        },
        MirrorOp::AccountDeleted => store.clear().await.map(|removed| {
            tracing::debug!(removed, "cleared pinned snippets");
            true
        }),
    };

    match result {
        Ok(true) => {
            tracing::debug!("mirrored {}", op);
            MirrorOutcome::Applied
        }
        Ok(false) => {
            tracing::debug!("{} not pinned; nothing to mirror", op);
            MirrorOutcome::NotPinned
        }
        Err(e) => {
            let error = Error::SyncMirror(format!("{op}: {e}"));
            tracing::warn!("{}", error);
            MirrorOutcome::Failed { op, error }
        }
    }
}
