/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Read-and-write handle owned by the consensus set, and the typed write batch used to mutate the Block
//! Store.
//!
//! # Initializing the Block Store
//!
//! All variables in the Block Store start out empty except four. These four variables, which must be
//! initialized using [`BlockStore::initialize`] (usually through
//! [`ConsensusSet::initialize`](crate::consensus_set::ConsensusSet::initialize)) before doing anything
//! else with the Block Store, are:
//!
//! |Variable|Initial value|
//! |---|---|
//! |Block Records|Contains only the genesis record.|
//! |Path at Height|Height 0 maps to the genesis block.|
//! |Current Height|0|
//! |Change Log Length|0|
//!
//! # Writing from the acceptance engine
//!
//! The acceptance engine never writes to the Block Store directly. It stages the records of newly
//! applied blocks and the best path updates into a [`BlockStoreWriteBatch`], and hands the batch to
//! [`ConsensusSet::apply_change`](crate::consensus_set::ConsensusSet::apply_change), which adds the new
//! change log entry to the same batch and writes everything atomically.

use std::{collections::HashMap, fmt::Display};

use borsh::BorshSerialize;

use crate::types::{
    block_record::StoredBlockRecord,
    change::ChangeEntry,
    data_types::{BlockHeight, BlockID, ChangeIndex},
};

use super::super::{
    pluggables::{KVGet, KVGetError, KVStore, Key, WriteBatch},
    variables::{self, concat},
};

use super::public::BlockStoreSnapshot;

/// Read and write handle into the block store that should be owned exclusively by one
/// [`ConsensusSet`](crate::consensus_set::ConsensusSet).
pub struct BlockStore<K: KVStore>(K);

impl<K: KVStore> BlockStore<K> {
    pub(crate) fn new(kv_store: K) -> Self {
        BlockStore(kv_store)
    }

    /// Initialize the block store variables listed in [initializing the block
    /// store](self#initializing-the-block-store), with `genesis` as the only block in the best chain.
    ///
    /// This function must be called exactly once on a `BlockStore` with an empty backing `kv_store`.
    pub fn initialize(&mut self, genesis: &StoredBlockRecord) -> Result<(), BlockStoreError> {
        if self.0.get(&variables::CURRENT_HEIGHT).is_some() {
            return Err(BlockStoreError::AlreadyInitialized);
        }

        let mut wb = BlockStoreWriteBatch::new();
        let genesis_id = wb.set_block_record(genesis)?;
        wb.set_path_at_height(BlockHeight::new(0), &genesis_id)?;
        wb.set_current_height(BlockHeight::new(0))?;
        wb.set_change_log_len(0)?;
        self.write(wb);

        Ok(())
    }

    /// Create a `BlockStoreSnapshot`.
    pub fn snapshot(&self) -> BlockStoreSnapshot<K::Snapshot<'_>> {
        BlockStoreSnapshot::new(self.0.snapshot())
    }

    /// Atomically write the changes in `write_batch` into the `BlockStore`.
    pub fn write(&mut self, write_batch: BlockStoreWriteBatch<K::WriteBatch>) {
        self.0.write(write_batch.into_inner())
    }
}

/// A typed batch of writes into the block store.
///
/// Besides forming keys and serializing values, the batch remembers every block record staged into it,
/// so that a change entry referring to those blocks can be computed before the batch is written.
pub struct BlockStoreWriteBatch<W: WriteBatch> {
    batch: W,
    staged_records: HashMap<BlockID, StoredBlockRecord>,
}

impl<W: WriteBatch> BlockStoreWriteBatch<W> {
    pub fn new() -> BlockStoreWriteBatch<W> {
        BlockStoreWriteBatch {
            batch: W::new(),
            staged_records: HashMap::new(),
        }
    }

    /* ↓↓↓ Block Records ↓↓↓ */

    /// Stage `record` under the ID of its block, and return that ID.
    pub fn set_block_record(
        &mut self,
        record: &StoredBlockRecord,
    ) -> Result<BlockID, BlockStoreError> {
        let block = record.id();
        self.batch.set(
            &concat(&variables::BLOCK_RECORDS, &block.bytes()),
            &serialize_value(record, Key::BlockRecord { block })?,
        );
        self.staged_records.insert(block, record.clone());
        Ok(block)
    }

    /// Get a block record that was staged into this batch, if any.
    pub fn staged_block_record(&self, block: &BlockID) -> Option<&StoredBlockRecord> {
        self.staged_records.get(block)
    }

    /* ↓↓↓ Path at Height ↓↓↓ */

    pub fn set_path_at_height(
        &mut self,
        height: BlockHeight,
        block: &BlockID,
    ) -> Result<(), BlockStoreError> {
        self.batch.set(
            &concat(&variables::PATH_AT_HEIGHT, &height.to_le_bytes()),
            &serialize_value(block, Key::PathAtHeight { height })?,
        );
        Ok(())
    }

    pub fn delete_path_at_height(&mut self, height: BlockHeight) {
        self.batch
            .delete(&concat(&variables::PATH_AT_HEIGHT, &height.to_le_bytes()))
    }

    /* ↓↓↓ Current Height ↓↓↓ */

    pub fn set_current_height(&mut self, height: BlockHeight) -> Result<(), BlockStoreError> {
        self.batch.set(
            &variables::CURRENT_HEIGHT,
            &serialize_value(&height, Key::CurrentHeight)?,
        );
        Ok(())
    }

    /* ↓↓↓ Change Log ↓↓↓ */

    pub(crate) fn set_change_entry(
        &mut self,
        index: ChangeIndex,
        entry: &ChangeEntry,
    ) -> Result<(), BlockStoreError> {
        self.batch.set(
            &concat(&variables::CHANGE_LOG, &index.to_le_bytes()),
            &serialize_value(entry, Key::ChangeEntry { index })?,
        );
        Ok(())
    }

    pub(crate) fn set_change_log_len(&mut self, len: u64) -> Result<(), BlockStoreError> {
        self.batch.set(
            &variables::CHANGE_LOG_LEN,
            &serialize_value(&len, Key::ChangeLogLength)?,
        );
        Ok(())
    }
}

impl<W: WriteBatch> BlockStoreWriteBatch<W> {
    pub(crate) fn into_inner(self) -> W {
        self.batch
    }
}

impl<W: WriteBatch> Default for BlockStoreWriteBatch<W> {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_value<T: BorshSerialize>(value: &T, key: Key) -> Result<Vec<u8>, KVSetError> {
    value
        .try_to_vec()
        .map_err(|err| KVSetError::SerializeValueError { key, source: err })
}

/// Error when trying to serialize a value to be set at a given key of the [key value store][KVStore].
#[derive(Debug)]
pub enum KVSetError {
    SerializeValueError { key: Key, source: std::io::Error },
}

impl Display for KVSetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KVSetError::SerializeValueError { key, source } => {
                write!(f, "failed to serialize {}: {}", key, source)
            }
        }
    }
}

#[derive(Debug)]
pub enum BlockStoreError {
    /// Error when trying to get a value from the block store's underlying [key value store][KVStore].
    KVGetError(KVGetError),

    /// Error when trying set a value into block store's underlying key value store.
    KVSetError(KVSetError),

    /// The best path has no block at `height`, even though `height` is not above the current height.
    PathExpectedButNotFound { height: BlockHeight },

    /// [`BlockStore::initialize`] was called on a block store that is already initialized.
    AlreadyInitialized,
}

impl Display for BlockStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockStoreError::KVGetError(err) => write!(f, "{}", err),
            BlockStoreError::KVSetError(err) => write!(f, "{}", err),
            BlockStoreError::PathExpectedButNotFound { height } => {
                write!(f, "no block in the best path at height {}", height)
            }
            BlockStoreError::AlreadyInitialized => write!(f, "block store is already initialized"),
        }
    }
}

impl From<KVGetError> for BlockStoreError {
    fn from(value: KVGetError) -> Self {
        BlockStoreError::KVGetError(value)
    }
}

impl From<KVSetError> for BlockStoreError {
    fn from(value: KVSetError) -> Self {
        BlockStoreError::KVSetError(value)
    }
}
