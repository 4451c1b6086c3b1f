/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byte-prefixes that specify where each Block Store variable is stored in the user-provided key-value
//! store.
//!
//! # List of State Variables
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |Block Records|[`BlockID`](crate::types::data_types::BlockID) -> [`StoredBlockRecord`](crate::types::block_record::StoredBlockRecord)|Mapping between a block's ID and the block together with every diff it produced when it was first applied. Records are never deleted, so that reverted blocks can still be replayed.|
//! |Path at Height|[`BlockHeight`](crate::types::data_types::BlockHeight) -> [`BlockID`](crate::types::data_types::BlockID)|Mapping between a height and the ID of the block at that height in the current best chain.|
//! |Current Height|[`BlockHeight`](crate::types::data_types::BlockHeight)|Height of the head of the current best chain.|
//! |Change Log|[`ChangeIndex`](crate::types::data_types::ChangeIndex) -> [`ChangeEntry`](crate::types::change::ChangeEntry)|Every change entry that has been appended to the change log.|
//! |Change Log Length|[`u64`]|Number of entries in the change log.|
//!
//! # Persistence of state variables
//!
//! Every variable is stored as a **Borsh-serialized value**.
//!
//! "Single values" (current height, change log length) are stored in one-byte, constant keys defined in
//! constants sharing the variable's name.
//!
//! Mappings of the form "`A` -> `B`" are stored in multiple keys, each key being the concatenation of a
//! one-byte prefix sharing the variable's name, and then a fixed-width encoding of `A`: the raw bytes
//! for block IDs, and the little-endian bytes for heights and change indices.
//!
//! For example, the key of the ID of the block at height 5 is:
//!
//! ```
//! # use consensus_set::block_store::variables::{concat, PATH_AT_HEIGHT};
//! let key = concat(&PATH_AT_HEIGHT, &5u64.to_le_bytes());
//! assert_eq!(key.len(), 9);
//! ```
//!
//! Note: if you ever need to set variables in the block store, you shouldn't need to use `WriteBatch`
//! directly. Instead, use
//! [`BlockStoreWriteBatch`](super::accessors::internal::BlockStoreWriteBatch), which abstracts the
//! forming of keys from you and then internally calls `WriteBatch::set`.

// State variables
pub const BLOCK_RECORDS: [u8; 1] = [0];
pub const PATH_AT_HEIGHT: [u8; 1] = [1];
pub const CURRENT_HEIGHT: [u8; 1] = [2];
pub const CHANGE_LOG: [u8; 1] = [3];
pub const CHANGE_LOG_LEN: [u8; 1] = [4];

/// Concatenate two byteslices into one vector.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}
