/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The in-memory, append-only record of every change entry a consensus set has recorded.
//!
//! The change log is mirrored in the [block store](crate::block_store::variables): every
//! [`push`](ChangeLog::push) is preceded by a write of the same entry into the store, in the same write
//! batch as the block records and best path updates it refers to. On start, the log is
//! [loaded](ChangeLog::load) back from the store.
//!
//! Entries are never mutated or removed, so a [`ChangeIndex`] denotes the same entry for as long as the
//! block store exists.

use crate::{
    block_store::{
        accessors::{internal::BlockStoreError, public::BlockStoreSnapshot},
        pluggables::KVGet,
    },
    types::{change::ChangeEntry, data_types::ChangeIndex},
};

#[derive(Clone, Debug, Default)]
pub(crate) struct ChangeLog(Vec<ChangeEntry>);

impl ChangeLog {
    /// Read the persisted change log from `snapshot`.
    pub(crate) fn load<S: KVGet>(
        snapshot: &BlockStoreSnapshot<S>,
    ) -> Result<ChangeLog, BlockStoreError> {
        Ok(ChangeLog(snapshot.change_entries()?))
    }

    /// Append `entry` and return its index.
    pub(crate) fn push(&mut self, entry: ChangeEntry) -> ChangeIndex {
        let index = self.next_index();
        self.0.push(entry);
        index
    }

    pub(crate) fn get(&self, index: ChangeIndex) -> Option<&ChangeEntry> {
        usize::try_from(index.int())
            .ok()
            .and_then(|i| self.0.get(i))
    }

    /// The index the next pushed entry will get.
    pub(crate) fn next_index(&self) -> ChangeIndex {
        ChangeIndex::new(self.0.len() as u64)
    }

    pub(crate) fn len(&self) -> u64 {
        self.0.len() as u64
    }

    /// Iterate through the entries starting at `start`, together with their indices.
    pub(crate) fn iter_from(&self, start: ChangeIndex) -> impl Iterator<Item = (ChangeIndex, &ChangeEntry)> {
        let start = usize::try_from(start.int()).unwrap_or(usize::MAX);
        self.0
            .iter()
            .enumerate()
            .skip(start)
            .map(|(i, entry)| (ChangeIndex::new(i as u64), entry))
    }
}
