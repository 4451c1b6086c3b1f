/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Change entries (what is recorded) and consensus changes (what subscribers receive).

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    block::Block,
    data_types::BlockID,
    diffs::{
        DelayedSiacoinOutputDiff, FileContractDiff, SiacoinOutputDiff, SiafundOutputDiff,
        SiafundPoolDiff,
    },
};

/// One atomic transition of the consensus state: the blocks that were reverted, followed by the blocks
/// that were applied.
///
/// A change entry only stores block IDs. The diffs that make up the corresponding
/// [`ConsensusChange`] are fetched from the [block store](crate::block_store) every time the change is
/// computed.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ChangeEntry {
    pub reverted_blocks: Vec<BlockID>,
    pub applied_blocks: Vec<BlockID>,
}

impl ChangeEntry {
    pub fn new(reverted_blocks: Vec<BlockID>, applied_blocks: Vec<BlockID>) -> ChangeEntry {
        ChangeEntry {
            reverted_blocks,
            applied_blocks,
        }
    }

    /// Create an entry that applies `blocks` without reverting anything.
    pub fn apply(blocks: Vec<BlockID>) -> ChangeEntry {
        ChangeEntry::new(Vec::new(), blocks)
    }
}

/// The materialized effect of one [`ChangeEntry`].
///
/// ## Ordering of diffs
///
/// In every diff sequence, the diffs produced by reverting blocks come first (in the order the blocks
/// are reverted, each block's diffs reversed and inverted), followed by the diffs of the applied blocks
/// (in the order the blocks are applied, each block's diffs as stored). Processing every sequence from
/// front to back therefore takes a subscriber from the state before the change to the state after it.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConsensusChange {
    pub reverted_blocks: Vec<Block>,
    pub applied_blocks: Vec<Block>,
    pub siacoin_output_diffs: Vec<SiacoinOutputDiff>,
    pub file_contract_diffs: Vec<FileContractDiff>,
    pub siafund_output_diffs: Vec<SiafundOutputDiff>,
    pub delayed_siacoin_output_diffs: Vec<DelayedSiacoinOutputDiff>,
    pub siafund_pool_diffs: Vec<SiafundPoolDiff>,
}

impl ConsensusChange {
    /// IDs of the reverted blocks, in revert order.
    pub fn reverted_block_ids(&self) -> Vec<BlockID> {
        self.reverted_blocks.iter().map(Block::id).collect()
    }

    /// IDs of the applied blocks, in apply order.
    pub fn applied_block_ids(&self) -> Vec<BlockID> {
        self.applied_blocks.iter().map(Block::id).collect()
    }
}
