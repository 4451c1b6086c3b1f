/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    block::Block,
    data_types::BlockID,
    diffs::{
        DelayedSiacoinOutputDiff, FileContractDiff, SiacoinOutputDiff, SiafundOutputDiff,
        SiafundPoolDiff,
    },
};

/// A block together with every diff it produced when it was first applied.
///
/// Records are written once by the acceptance engine through
/// [`BlockStoreWriteBatch::set_block_record`](crate::block_store::accessors::internal::BlockStoreWriteBatch::set_block_record)
/// and are read-only afterwards. Diff sequences are kept in the order the mutations happened.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StoredBlockRecord {
    pub block: Block,
    pub siacoin_output_diffs: Vec<SiacoinOutputDiff>,
    pub file_contract_diffs: Vec<FileContractDiff>,
    pub siafund_output_diffs: Vec<SiafundOutputDiff>,
    pub delayed_siacoin_output_diffs: Vec<DelayedSiacoinOutputDiff>,
    pub siafund_pool_diffs: Vec<SiafundPoolDiff>,
}

impl StoredBlockRecord {
    /// Create a record for `block` that has not produced any diffs.
    pub fn new(block: Block) -> StoredBlockRecord {
        StoredBlockRecord {
            block,
            siacoin_output_diffs: Vec::new(),
            file_contract_diffs: Vec::new(),
            siafund_output_diffs: Vec::new(),
            delayed_siacoin_output_diffs: Vec::new(),
            siafund_pool_diffs: Vec::new(),
        }
    }

    pub fn id(&self) -> BlockID {
        self.block.id()
    }
}
