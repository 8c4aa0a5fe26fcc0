//! Linear undo/redo history.
//!
//! History is an arena of shared, immutable snapshots plus a cursor counting
//! how many entries are applied. Pushing after an undo truncates the
//! redoable tail before appending.

use std::rc::Rc;

use crate::model::Snapshot;

/// One named history entry.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub name: String,
    pub snapshot: Rc<Snapshot>,
}

/// Snapshot arena indexed by a 1-based cursor.
///
/// Invariant: `0 <= index <= entries.len()`.
#[derive(Debug, Default, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry at or after the cursor, append, advance the cursor.
    pub fn push(&mut self, name: impl Into<String>, snapshot: Rc<Snapshot>) {
        let name = name.into();
        if self.index < self.entries.len() {
            tracing::debug!(
                discarded = self.entries.len() - self.index,
                "discarding redoable history"
            );
        }
        self.entries.truncate(self.index);
        tracing::trace!(entry = %name, index = self.index + 1, "history push");
        self.entries.push(HistoryEntry { name, snapshot });
        self.index += 1;
    }

    pub fn can_undo(&self) -> bool {
        self.index > 1
    }

    pub fn can_redo(&self) -> bool {
        self.index < self.entries.len()
    }

    /// Step back one entry and return the snapshot that becomes current.
    pub fn undo(&mut self) -> Option<Rc<Snapshot>> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(self.entries[self.index - 1].snapshot.clone())
    }

    /// Step forward one entry and return the snapshot that becomes current.
    pub fn redo(&mut self) -> Option<Rc<Snapshot>> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(self.entries[self.index - 1].snapshot.clone())
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}
