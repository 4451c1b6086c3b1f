/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Materializes [`ConsensusChange`]s out of [`ChangeEntry`]s.
//!
//! ## Replaying a change entry
//!
//! A change entry is replayed in two passes over its blocks:
//! 1. For every reverted block, in the order listed: the block is appended to `reverted_blocks`, and
//!    every one of its diff sequences is appended **back to front**, because diffs inside a block can
//!    depend on each other (e.g., an output created and then spent in the same block) and undoing them
//!    has to retrace those steps backwards. Siacoin output, file contract, siafund output and delayed
//!    siacoin output diffs have their direction inverted. Siafund pool diffs instead always get the
//!    direction `Revert`, whatever direction they were stored with: the pool only ever accumulates, so
//!    reverting a pool diff always means going back to its `previous` value.
//! 2. For every applied block, in the order listed: the block is appended to `applied_blocks`, and every
//!    one of its diff sequences is appended as stored.
//!
//! All of the block records one computation needs are read through a single [`BlockRecordSource`],
//! which is always backed by one [`BlockStoreSnapshot`], so a change is never computed out of a torn
//! view of the block store.

use crate::{
    block_store::{
        accessors::{
            internal::{BlockStoreError, BlockStoreWriteBatch},
            public::BlockStoreSnapshot,
        },
        pluggables::{KVGet, WriteBatch},
    },
    change_log::ChangeLog,
    consensus_set::ConsensusSetError,
    types::{
        block_record::StoredBlockRecord,
        change::{ChangeEntry, ConsensusChange},
        data_types::{BlockID, ChangeIndex},
        diffs::{DiffDirection, DirectionalDiff},
    },
};

/// A consistent view of block records.
pub(crate) trait BlockRecordSource {
    fn block_record(&self, block: &BlockID) -> Result<Option<StoredBlockRecord>, BlockStoreError>;
}

impl<S: KVGet> BlockRecordSource for BlockStoreSnapshot<S> {
    fn block_record(&self, block: &BlockID) -> Result<Option<StoredBlockRecord>, BlockStoreError> {
        BlockStoreSnapshot::block_record(self, block)
    }
}

/// A snapshot of the block store overlaid with the block records staged in a write batch that has not
/// been written yet.
pub(crate) struct StagedBlockRecords<'a, S: KVGet, W: WriteBatch> {
    snapshot: &'a BlockStoreSnapshot<S>,
    write_batch: &'a BlockStoreWriteBatch<W>,
}

impl<'a, S: KVGet, W: WriteBatch> StagedBlockRecords<'a, S, W> {
    pub(crate) fn new(
        snapshot: &'a BlockStoreSnapshot<S>,
        write_batch: &'a BlockStoreWriteBatch<W>,
    ) -> Self {
        StagedBlockRecords {
            snapshot,
            write_batch,
        }
    }
}

impl<'a, S: KVGet, W: WriteBatch> BlockRecordSource for StagedBlockRecords<'a, S, W> {
    fn block_record(&self, block: &BlockID) -> Result<Option<StoredBlockRecord>, BlockStoreError> {
        match self.write_batch.staged_block_record(block) {
            Some(record) => Ok(Some(record.clone())),
            None => self.snapshot.block_record(block),
        }
    }
}

/// Compute the consensus change of the entry at `index` in `change_log`.
pub(crate) fn compute_change<R: BlockRecordSource>(
    records: &R,
    change_log: &ChangeLog,
    index: ChangeIndex,
    verify_block_ids: bool,
) -> Result<ConsensusChange, ConsensusSetError> {
    let entry = change_log
        .get(index)
        .ok_or(ConsensusSetError::OutOfRange {
            index,
            len: change_log.len(),
        })?;
    replay_entry(records, entry, verify_block_ids)
}

/// Compute the consensus change of `entry`, which may or may not be in the change log yet.
pub(crate) fn replay_entry<R: BlockRecordSource>(
    records: &R,
    entry: &ChangeEntry,
    verify_block_ids: bool,
) -> Result<ConsensusChange, ConsensusSetError> {
    let mut change = ConsensusChange::default();

    for block in &entry.reverted_blocks {
        let record = fetch_record(records, block, verify_block_ids)?;

        change.reverted_blocks.push(record.block);
        push_reverted(&mut change.siacoin_output_diffs, record.siacoin_output_diffs);
        push_reverted(&mut change.file_contract_diffs, record.file_contract_diffs);
        push_reverted(&mut change.siafund_output_diffs, record.siafund_output_diffs);
        push_reverted(
            &mut change.delayed_siacoin_output_diffs,
            record.delayed_siacoin_output_diffs,
        );
        change
            .siafund_pool_diffs
            .extend(record.siafund_pool_diffs.into_iter().rev().map(|mut diff| {
                diff.set_direction(DiffDirection::Revert);
                diff
            }));
    }

    for block in &entry.applied_blocks {
        let record = fetch_record(records, block, verify_block_ids)?;

        change.applied_blocks.push(record.block);
        change.siacoin_output_diffs.extend(record.siacoin_output_diffs);
        change.file_contract_diffs.extend(record.file_contract_diffs);
        change.siafund_output_diffs.extend(record.siafund_output_diffs);
        change
            .delayed_siacoin_output_diffs
            .extend(record.delayed_siacoin_output_diffs);
        change.siafund_pool_diffs.extend(record.siafund_pool_diffs);
    }

    Ok(change)
}

fn fetch_record<R: BlockRecordSource>(
    records: &R,
    block: &BlockID,
    verify_block_ids: bool,
) -> Result<StoredBlockRecord, ConsensusSetError> {
    let record = records
        .block_record(block)?
        .ok_or(ConsensusSetError::StoreInconsistency { block: *block })?;

    if verify_block_ids && record.id() != *block {
        log::error!(
            "Block record stored under {} holds a block with ID {}",
            block,
            record.id()
        );
        return Err(ConsensusSetError::StoreInconsistency { block: *block });
    }

    Ok(record)
}

fn push_reverted<D: DirectionalDiff>(change_diffs: &mut Vec<D>, block_diffs: Vec<D>) {
    change_diffs.extend(block_diffs.into_iter().rev().map(|mut diff| {
        diff.set_direction(diff.direction().inverse());
        diff
    }));
}
