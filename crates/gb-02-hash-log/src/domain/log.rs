//! The append-only log itself.

use super::{LogError, LogResult};
use shared_types::Entry;
use tracing::debug;

/// Outcome of applying a batch of replayed entries.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Entries appended, in order.
    pub applied: Vec<Entry>,
    /// First entry refused, with the reason. Nothing after it was tried.
    pub rejected: Option<(u64, LogError)>,
}

/// Ordered, hash-linked sequence of entries rooted at genesis.
///
/// # Invariants
/// - `entries[0]` is the genesis entry.
/// - For every `i > 0`: `entries[i].previous_hash == entries[i-1].hash`,
///   `entries[i].index == i`, and `entries[i].hash` recomputes.
/// - Entries are never mutated once appended. They are only removed by
///   [`rewind`](HashLog::rewind), and genesis never is.
#[derive(Debug, Clone)]
pub struct HashLog {
    entries: Vec<Entry>,
}

impl HashLog {
    /// Create a log holding only the genesis entry.
    pub fn new() -> Self {
        Self {
            entries: vec![Entry::genesis()],
        }
    }

    /// Most recent entry.
    pub fn head(&self) -> &Entry {
        // `entries` always holds genesis.
        &self.entries[self.entries.len() - 1]
    }

    /// Index of the head entry.
    pub fn height(&self) -> u64 {
        self.head().index
    }

    /// Number of entries including genesis.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; genesis is present from construction.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u64) -> Option<&Entry> {
        usize::try_from(index).ok().and_then(|i| self.entries.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Entries `from..=to`, clamped to what the log holds.
    pub fn range(&self, from: u64, to: u64) -> Vec<Entry> {
        let to = to.min(self.height());
        if from > to {
            return Vec::new();
        }
        (from..=to).filter_map(|i| self.get(i).cloned()).collect()
    }

    /// Recompute the hash from canonical fields. Signatures are not checked.
    pub fn verify(entry: &Entry) -> bool {
        entry.hash_matches()
    }

    /// Check that `entry` would be accepted by [`append`](Self::append).
    pub fn check_append(&self, entry: &Entry) -> LogResult<()> {
        let head = self.head();
        if entry.index != head.index + 1 || entry.previous_hash != head.hash {
            return Err(LogError::ChainConflict {
                index: entry.index,
                previous_hash: entry.previous_hash.clone(),
                head_index: head.index,
                head_hash: head.hash.clone(),
            });
        }
        if !Self::verify(entry) {
            return Err(LogError::HashMismatch { index: entry.index });
        }
        Ok(())
    }

    pub fn can_append(&self, entry: &Entry) -> bool {
        self.check_append(entry).is_ok()
    }

    /// Append `entry` if it extends the head; the log is unchanged otherwise.
    pub fn append(&mut self, entry: Entry) -> LogResult<()> {
        self.check_append(&entry)?;
        debug!(
            "[gb-02] Appended entry {} ({})",
            entry.index,
            entry.short_hash()
        );
        self.entries.push(entry);
        Ok(())
    }

    /// Append replayed entries strictly in order, stopping at the first one
    /// that fails `accept` or the append rules.
    ///
    /// `accept` carries checks the log cannot make itself (signatures).
    pub fn append_batch<I, F>(&mut self, entries: I, mut accept: F) -> BatchOutcome
    where
        I: IntoIterator<Item = Entry>,
        F: FnMut(&Entry) -> LogResult<()>,
    {
        let mut outcome = BatchOutcome::default();
        for entry in entries {
            let index = entry.index;
            let checked = accept(&entry).and_then(|_| self.check_append(&entry));
            if let Err(e) = checked {
                outcome.rejected = Some((index, e));
                break;
            }
            self.entries.push(entry.clone());
            outcome.applied.push(entry);
        }
        outcome
    }

    /// Drop every entry above `height` and return them in log order.
    ///
    /// Used when a competing branch wins; genesis is always kept.
    pub fn rewind(&mut self, height: u64) -> Vec<Entry> {
        let keep = usize::try_from(height)
            .map_or(self.entries.len(), |h| h.saturating_add(1))
            .max(1);
        if keep >= self.entries.len() {
            return Vec::new();
        }
        let removed = self.entries.split_off(keep);
        debug!(
            "[gb-02] Rewound to {}, dropped {} entries",
            self.height(),
            removed.len()
        );
        removed
    }

    /// Re-check every stored link. Only fails if the log was corrupted.
    pub fn validate_chain(&self) -> LogResult<()> {
        for window in self.entries.windows(2) {
            let (prev, curr) = (&window[0], &window[1]);
            if curr.previous_hash != prev.hash || curr.index != prev.index + 1 {
                return Err(LogError::BrokenLink { index: curr.index });
            }
            if !Self::verify(curr) {
                return Err(LogError::HashMismatch { index: curr.index });
            }
        }
        Ok(())
    }
}

impl Default for HashLog {
    fn default() -> Self {
        Self::new()
    }
}
