use crate::git::{GitError, Vcs};
use crate::patch::build_patch;
use crate::splitter::split_files;
use crate::store::{ReviewStore, StoreError, UndoRow};
use crate::{DiffFile, HunkStatus};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors surfaced by review operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{op} failed for {path}: {source}")]
    Apply {
        path: String,
        op: &'static str,
        #[source]
        source: GitError,
    },
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// One entry of the linear undo history, carrying only the data needed to
/// invert the action. A `Reject` keeps the exact patch that was
/// reverse-applied so undo can re-apply it forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    Approve {
        file_path: String,
        hunk_id: String,
    },
    Reject {
        file_path: String,
        hunk_id: String,
        patch: String,
    },
}

impl UndoAction {
    fn file_path(&self) -> &str {
        match self {
            UndoAction::Approve { file_path, .. } | UndoAction::Reject { file_path, .. } => {
                file_path
            }
        }
    }
}

/// In-memory mirror of one journal row: the action plus the row id that
/// deletes it when it is undone.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UndoRecord {
    row_id: i64,
    action: UndoAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    Approve,
    Reject,
}

/// What `undo` did, so the consumer can refresh the right view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Undone { file_path: String, kind: UndoKind },
    Empty,
}

/// The long-lived owner of review decisions.
///
/// Holds per-file identity→status maps, the global undo stack, and the
/// durable store. The stack is journaled in the store, so undo reaches
/// back across processes; the in-memory vector is just its mirror. Files
/// and hunks are never mutated here; every mutation of the working tree
/// goes through the `Vcs` and is followed by a fresh parse and a
/// reconciliation by identity.
///
/// All methods are synchronous; the caller is expected to serialize
/// mutating calls per file (`reject_all` in particular must not overlap
/// with other mutations on the same file).
pub struct ReviewEngine<V: Vcs> {
    vcs: V,
    store: ReviewStore,
    statuses: HashMap<String, HashMap<String, HunkStatus>>,
    undo_stack: Vec<UndoRecord>,
}

impl<V: Vcs> ReviewEngine<V> {
    /// Create an engine seeded with the approvals and the undo journal
    /// persisted in `store`.
    pub fn new(vcs: V, store: ReviewStore) -> Result<Self> {
        let mut statuses = HashMap::new();
        for (path, ids) in store.load_all()? {
            let map = ids
                .into_iter()
                .map(|id| (id, HunkStatus::Approved))
                .collect();
            statuses.insert(path, map);
        }
        let undo_stack = store
            .load_undo()?
            .into_iter()
            .filter_map(revive_record)
            .collect();
        Ok(Self {
            vcs,
            store,
            statuses,
            undo_stack,
        })
    }

    /// Read the full diff, parse/split/identify it, reconcile every file,
    /// and drop state for files that no longer appear (e.g. after a
    /// commit).
    pub fn load(&mut self) -> Result<Vec<DiffFile>> {
        let diff = self.vcs.read_diff()?;
        let files = split_files(&diff);
        for file in &files {
            if !file.is_binary {
                self.reconcile(file)?;
            }
        }
        self.prune_committed_files(&files)?;
        Ok(files)
    }

    /// Rebuild one file's status map from a freshly parsed `DiffFile`.
    ///
    /// Statuses carry over by identity; new identities default to pending;
    /// identities no longer present are dropped silently (this is how
    /// rejected and committed hunks disappear from tracking).
    pub fn reconcile(&mut self, file: &DiffFile) -> Result<()> {
        let path = file.path().to_string();
        let prior = self.statuses.remove(&path).unwrap_or_default();

        let mut fresh = HashMap::new();
        for hunk in &file.hunks {
            let Some(id) = &hunk.id else { continue };
            let status = prior.get(id).copied().unwrap_or(HunkStatus::Pending);
            fresh.insert(id.clone(), status);
        }

        for (id, status) in &prior {
            if *status == HunkStatus::Approved && !fresh.contains_key(id) {
                self.store.remove(&path, id)?;
            }
        }

        self.statuses.insert(path, fresh);
        Ok(())
    }

    /// Statuses ordered to match `file.hunks`. Identities absent from the
    /// map read as pending.
    pub fn statuses(&self, file: &DiffFile) -> Vec<HunkStatus> {
        file.hunks
            .iter()
            .map(|hunk| match &hunk.id {
                Some(id) => self.status_of(file.path(), id),
                None => HunkStatus::Pending,
            })
            .collect()
    }

    fn status_of(&self, path: &str, id: &str) -> HunkStatus {
        self.statuses
            .get(path)
            .and_then(|map| map.get(id))
            .copied()
            .unwrap_or(HunkStatus::Pending)
    }

    /// A file is resolved when it is tracked, has at least one hunk, and
    /// every hunk is approved.
    pub fn is_resolved(&self, path: &str) -> bool {
        self.statuses.get(path).is_some_and(|map| {
            !map.is_empty() && map.values().all(|s| *s == HunkStatus::Approved)
        })
    }

    /// Mark one pending hunk approved. Unknown path or identity, or a
    /// non-pending status, is a no-op (the UI can race a refresh).
    pub fn approve(&mut self, path: &str, id: &str) -> Result<()> {
        let Some(status) = self.statuses.get_mut(path).and_then(|m| m.get_mut(id)) else {
            return Ok(());
        };
        if *status != HunkStatus::Pending {
            return Ok(());
        }
        *status = HunkStatus::Approved;
        self.store.insert(path, id)?;
        let row_id = self.store.push_undo("approve", path, id, None)?;
        self.undo_stack.push(UndoRecord {
            row_id,
            action: UndoAction::Approve {
                file_path: path.to_string(),
                hunk_id: id.to_string(),
            },
        });
        Ok(())
    }

    /// Approve every pending hunk of `file`, pushing one undo record per
    /// hunk so bulk approval still undoes granularly. Returns the count.
    pub fn approve_all(&mut self, path: &str, file: &DiffFile) -> Result<usize> {
        let mut count = 0;
        for hunk in &file.hunks {
            let Some(id) = &hunk.id else { continue };
            if self.status_of(path, id) == HunkStatus::Pending {
                self.approve(path, id)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Targeted reversal of one approval, distinct from global undo: the
    /// status returns to pending and the matching approve record is
    /// removed from anywhere in the stack, searched from the top.
    pub fn unapprove(&mut self, path: &str, id: &str) -> Result<()> {
        let Some(status) = self.statuses.get_mut(path).and_then(|m| m.get_mut(id)) else {
            return Ok(());
        };
        if *status != HunkStatus::Approved {
            return Ok(());
        }
        *status = HunkStatus::Pending;
        self.store.remove(path, id)?;

        let matching = self.undo_stack.iter().rposition(|record| {
            matches!(&record.action, UndoAction::Approve { file_path, hunk_id }
                if file_path == path && hunk_id == id)
        });
        if let Some(pos) = matching {
            let record = self.undo_stack.remove(pos);
            self.store.remove_undo(record.row_id)?;
        }
        Ok(())
    }

    /// Reject one hunk: reverse-apply its patch, drop its identity, record
    /// the forward patch for undo, then re-diff the file and reconcile.
    ///
    /// Returns the freshly reconciled `DiffFile`, or `None` when the file
    /// has no differences left. An unknown identity performs no apply and
    /// just refreshes. On apply failure the status map is left untouched.
    pub fn reject(&mut self, path: &str, id: &str, file: &DiffFile) -> Result<Option<DiffFile>> {
        let Some(hunk) = file.hunks.iter().find(|h| h.id.as_deref() == Some(id)) else {
            return self.refresh_file(path);
        };

        let patch = build_patch(file, hunk);
        self.vcs
            .apply_reverse(&patch)
            .map_err(|source| EngineError::Apply {
                path: path.to_string(),
                op: "reverse-apply",
                source,
            })?;

        if let Some(map) = self.statuses.get_mut(path) {
            map.remove(id);
        }
        self.store.remove(path, id)?;
        let row_id = self.store.push_undo("reject", path, id, Some(&patch))?;
        self.undo_stack.push(UndoRecord {
            row_id,
            action: UndoAction::Reject {
                file_path: path.to_string(),
                hunk_id: id.to_string(),
                patch,
            },
        });

        self.refresh_file(path)
    }

    /// Reject every pending hunk of the file, one at a time.
    ///
    /// Each step reverse-applies a single hunk and then re-diffs, because
    /// every on-disk change invalidates the line numbers of all later
    /// hunks; batching the patches would apply stale coordinates. A failed
    /// step surfaces its error without touching that step's status;
    /// already-completed steps remain committed.
    pub fn reject_all(&mut self, path: &str, file: &DiffFile) -> Result<Option<DiffFile>> {
        let mut current = file.clone();
        loop {
            let next = current
                .hunks
                .iter()
                .filter_map(|h| h.id.as_deref())
                .find(|id| self.status_of(path, id) == HunkStatus::Pending)
                .map(str::to_string);
            let Some(id) = next else {
                return Ok(Some(current));
            };
            match self.reject(path, &id, &current)? {
                Some(file) => current = file,
                None => return Ok(None),
            }
        }
    }

    /// Pop and invert the most recent action. No redo.
    ///
    /// Undoing a reject forward-applies the stored patch; the hunk
    /// reappears as pending (under a recomputed identity) on the next
    /// reconciliation. If the forward apply fails, the record stays on the
    /// stack and in the journal so the caller can retry after reconciling.
    pub fn undo(&mut self) -> Result<UndoOutcome> {
        let Some(record) = self.undo_stack.last().cloned() else {
            return Ok(UndoOutcome::Empty);
        };

        match record.action {
            UndoAction::Approve { file_path, hunk_id } => {
                self.undo_stack.pop();
                self.store.remove_undo(record.row_id)?;
                if let Some(map) = self.statuses.get_mut(&file_path)
                    && let Some(status) = map.get_mut(&hunk_id)
                {
                    *status = HunkStatus::Pending;
                }
                self.store.remove(&file_path, &hunk_id)?;
                Ok(UndoOutcome::Undone {
                    file_path,
                    kind: UndoKind::Approve,
                })
            }
            UndoAction::Reject {
                file_path, patch, ..
            } => {
                self.vcs
                    .apply_forward(&patch)
                    .map_err(|source| EngineError::Apply {
                        path: file_path.clone(),
                        op: "forward-apply",
                        source,
                    })?;
                self.undo_stack.pop();
                self.store.remove_undo(record.row_id)?;
                Ok(UndoOutcome::Undone {
                    file_path,
                    kind: UndoKind::Reject,
                })
            }
        }
    }

    /// Drop tracked state for every file path absent from the latest full
    /// diff, so committed files do not leak stale approvals.
    pub fn prune_committed_files(&mut self, current_files: &[DiffFile]) -> Result<()> {
        let live: HashSet<&str> = current_files.iter().map(|f| f.path()).collect();
        let stale: Vec<String> = self
            .statuses
            .keys()
            .filter(|path| !live.contains(path.as_str()))
            .cloned()
            .collect();
        for path in stale {
            self.statuses.remove(&path);
            self.store.remove_file(&path)?;
            // A committed file's decisions are final; its undo history
            // goes with it.
            self.store.remove_undo_file(&path)?;
            self.undo_stack
                .retain(|record| record.action.file_path() != path);
        }
        Ok(())
    }

    /// Current on-disk content of a file, for consumers that want to show
    /// hunks in context.
    pub fn file_content(&self, path: &str) -> Result<Vec<String>> {
        Ok(self.vcs.read_file_content(path)?)
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Re-diff one file and reconcile. `None` means the file has no
    /// remaining differences; its tracked state is dropped.
    fn refresh_file(&mut self, path: &str) -> Result<Option<DiffFile>> {
        let diff = self.vcs.read_file_diff(path)?;
        let files = split_files(&diff);
        match files
            .into_iter()
            .find(|f| f.path() == path && !f.is_binary)
        {
            Some(file) => {
                self.reconcile(&file)?;
                Ok(Some(file))
            }
            None => {
                self.statuses.remove(path);
                self.store.remove_file(path)?;
                Ok(None)
            }
        }
    }
}

/// Rebuild an in-memory record from a journal row. A reject row missing
/// its patch cannot be inverted and is skipped.
fn revive_record(row: UndoRow) -> Option<UndoRecord> {
    let action = match (row.kind.as_str(), row.patch) {
        ("approve", _) => UndoAction::Approve {
            file_path: row.file_path,
            hunk_id: row.hunk_id,
        },
        ("reject", Some(patch)) => UndoAction::Reject {
            file_path: row.file_path,
            hunk_id: row.hunk_id,
            patch,
        },
        _ => return None,
    };
    Some(UndoRecord {
        row_id: row.id,
        action,
    })
}
