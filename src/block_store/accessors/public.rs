/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! General purpose, read-only interface for querying the Block Store.

use crate::types::{
    block_record::StoredBlockRecord,
    change::ChangeEntry,
    data_types::{BlockHeight, BlockID, ChangeIndex},
};

use super::super::pluggables::{KVGet, KVGetError, KVStore, Key};

use super::internal::BlockStoreError;

/// A factory for [`BlockStoreSnapshot`]s.
#[derive(Clone)]
pub struct BlockStoreCamera<K: KVStore>(K);

impl<K: KVStore> BlockStoreCamera<K> {
    pub fn new(kv_store: K) -> Self {
        BlockStoreCamera(kv_store)
    }

    pub fn snapshot(&self) -> BlockStoreSnapshot<K::Snapshot<'_>> {
        BlockStoreSnapshot(self.0.snapshot())
    }
}

/// A read-only view into the block store that is guaranteed to stay unchanged.
pub struct BlockStoreSnapshot<S: KVGet>(pub(super) S);

impl<S: KVGet> BlockStoreSnapshot<S> {
    pub(crate) fn new(kv_snapshot: S) -> Self {
        BlockStoreSnapshot(kv_snapshot)
    }

    /* ↓↓↓ Used for bootstrapping subscribers ↓↓↓ */

    /// Get the IDs of every block in the current best chain, from genesis (height 0) up to and including
    /// the block at the current height.
    pub fn current_path(&self) -> Result<Vec<BlockID>, BlockStoreError> {
        // Not pre-sized: the stored height is only trusted as far as the path keys agree with it.
        let current_height = self.current_height()?;
        let mut res = Vec::new();

        for height in (0..=current_height.int()).map(BlockHeight::new) {
            let block = self
                .path_at_height(height)?
                .ok_or(BlockStoreError::PathExpectedButNotFound { height })?;
            res.push(block);
        }

        Ok(res)
    }

    /// Get every entry of the persisted change log, in index order.
    pub(crate) fn change_entries(&self) -> Result<Vec<ChangeEntry>, BlockStoreError> {
        let len = self.change_log_len()?;
        let mut res = Vec::new();
        for i in 0..len {
            let index = ChangeIndex::new(i);
            let entry = self
                .change_entry(index)?
                .ok_or(KVGetError::ValueExpectedButNotFound {
                    key: Key::ChangeEntry { index },
                })?;
            res.push(entry);
        }

        Ok(res)
    }

    /* ↓↓↓ Basic state getters ↓↓↓ */

    pub fn block_record(
        &self,
        block: &BlockID,
    ) -> Result<Option<StoredBlockRecord>, BlockStoreError> {
        Ok(self.0.block_record(block)?)
    }

    pub fn path_at_height(&self, height: BlockHeight) -> Result<Option<BlockID>, BlockStoreError> {
        Ok(self.0.path_at_height(height)?)
    }

    pub fn current_height(&self) -> Result<BlockHeight, BlockStoreError> {
        Ok(self.0.current_height()?)
    }

    pub fn change_entry(&self, index: ChangeIndex) -> Result<Option<ChangeEntry>, BlockStoreError> {
        Ok(self.0.change_entry(index)?)
    }

    pub fn change_log_len(&self) -> Result<u64, BlockStoreError> {
        Ok(self.0.change_log_len()?)
    }
}
