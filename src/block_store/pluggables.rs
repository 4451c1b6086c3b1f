/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for pluggable Block Store persistence.

use std::fmt::Display;

use borsh::BorshDeserialize;

use crate::types::{
    block_record::StoredBlockRecord,
    change::ChangeEntry,
    data_types::{BlockHeight, BlockID, ChangeIndex},
};

use super::variables::{self, concat};

/// A key-value store with atomic, batched writes and consistent snapshots.
///
/// `write` is only ever called by the consensus set while it holds exclusive access, so implementations
/// only need to make each individual call atomic. A `Snapshot` must not observe any write that happens
/// after it was created.
pub trait KVStore: KVGet + Clone + Send + Sync + 'static {
    type WriteBatch: WriteBatch;
    type Snapshot<'a>: 'a + KVGet;

    fn write(&mut self, wb: Self::WriteBatch);
    fn snapshot<'b>(&'b self) -> Self::Snapshot<'_>;
}

pub trait KVGet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /* ↓↓↓ Block Records ↓↓↓ */

    fn block_record(&self, block: &BlockID) -> Result<Option<StoredBlockRecord>, KVGetError> {
        match self.get(&concat(&variables::BLOCK_RECORDS, &block.bytes())) {
            Some(bytes) => Ok(Some(deserialize_value(
                &bytes,
                Key::BlockRecord { block: *block },
            )?)),
            None => Ok(None),
        }
    }

    /* ↓↓↓ Path at Height ↓↓↓ */

    fn path_at_height(&self, height: BlockHeight) -> Result<Option<BlockID>, KVGetError> {
        match self.get(&concat(&variables::PATH_AT_HEIGHT, &height.to_le_bytes())) {
            Some(bytes) => Ok(Some(deserialize_value(
                &bytes,
                Key::PathAtHeight { height },
            )?)),
            None => Ok(None),
        }
    }

    /* ↓↓↓ Current Height ↓↓↓ */

    fn current_height(&self) -> Result<BlockHeight, KVGetError> {
        let bytes = self
            .get(&variables::CURRENT_HEIGHT)
            .ok_or(KVGetError::ValueExpectedButNotFound {
                key: Key::CurrentHeight,
            })?;
        deserialize_value(&bytes, Key::CurrentHeight)
    }

    /* ↓↓↓ Change Log ↓↓↓ */

    fn change_entry(&self, index: ChangeIndex) -> Result<Option<ChangeEntry>, KVGetError> {
        match self.get(&concat(&variables::CHANGE_LOG, &index.to_le_bytes())) {
            Some(bytes) => Ok(Some(deserialize_value(
                &bytes,
                Key::ChangeEntry { index },
            )?)),
            None => Ok(None),
        }
    }

    fn change_log_len(&self) -> Result<u64, KVGetError> {
        let bytes = self
            .get(&variables::CHANGE_LOG_LEN)
            .ok_or(KVGetError::ValueExpectedButNotFound {
                key: Key::ChangeLogLength,
            })?;
        deserialize_value(&bytes, Key::ChangeLogLength)
    }
}

fn deserialize_value<T: BorshDeserialize>(bytes: &[u8], key: Key) -> Result<T, KVGetError> {
    T::deserialize(&mut &*bytes).map_err(|err| KVGetError::DeserializeValueError { key, source: err })
}

/// Error when trying to read a value corresponding to a given key from the [key value store][KVStore].
/// The error may arise in the following circumstances:
/// 1. The value corresponding to a given key cannot be deserialized into its expected type,
/// 2. The value corresponding to a given key cannot be found, even though it is always set after
///    [initialization](super::accessors::internal::BlockStore::initialize).
#[derive(Debug)]
pub enum KVGetError {
    DeserializeValueError { key: Key, source: std::io::Error },
    ValueExpectedButNotFound { key: Key },
}

impl Display for KVGetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KVGetError::DeserializeValueError { key, source } => {
                write!(f, "failed to deserialize {}: {}", key, source)
            }
            KVGetError::ValueExpectedButNotFound { key } => {
                write!(f, "{} expected but not found", key)
            }
        }
    }
}

#[derive(Debug)]
pub enum Key {
    BlockRecord { block: BlockID },
    PathAtHeight { height: BlockHeight },
    CurrentHeight,
    ChangeEntry { index: ChangeIndex },
    ChangeLogLength,
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            &Key::BlockRecord { block } => write!(f, "Block Record for block {}", block),
            &Key::PathAtHeight { height } => write!(f, "Path at height {}", height),
            &Key::CurrentHeight => write!(f, "Current Height"),
            &Key::ChangeEntry { index } => write!(f, "Change Entry at index {}", index),
            &Key::ChangeLogLength => write!(f, "Change Log Length"),
        }
    }
}

pub trait WriteBatch {
    fn new() -> Self;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
}
