//! A stand-in for the acceptance engine: builds blocks with random diffs on top of a best path, and
//! stages their records and the matching path updates into write batches.

use std::collections::HashMap;

use consensus_set::{
    block_store::accessors::internal::BlockStoreWriteBatch,
    consensus_set::{Configuration, ConsensusSet, ConsensusSetSpec},
    types::{
        block::Block,
        block_record::StoredBlockRecord,
        change::{ChangeEntry, ConsensusChange},
        data_types::{
            BlockHeight, BlockID, Currency, Data, FileContractID, OutputID, UnlockHash,
        },
        diffs::{
            DelayedSiacoinOutputDiff, DiffDirection, FileContract, FileContractDiff, SiacoinOutput,
            SiacoinOutputDiff, SiafundOutput, SiafundOutputDiff, SiafundPoolDiff,
        },
    },
};
use rand::Rng;

use super::mem_db::{MemDB, MemWriteBatch};

/// Start a consensus set without event handlers on an initialized `kv_store`.
pub(crate) fn start_consensus_set(kv_store: MemDB) -> ConsensusSet<MemDB> {
    ConsensusSetSpec::builder()
        .kv_store(kv_store)
        .configuration(Configuration::builder().log_events(false).build())
        .build()
        .start()
        .unwrap()
}

pub(crate) fn genesis() -> StoredBlockRecord {
    StoredBlockRecord::new(Block::new(BlockID::new([0; 32]), 0, 0, Data::default()))
}

/// Create a record for a new child of `parent` with a few random diffs of every kind.
pub(crate) fn random_record(parent: BlockID, nonce: u64) -> StoredBlockRecord {
    let mut rng = rand::thread_rng();
    let block = Block::new(
        parent,
        nonce,
        rng.gen(),
        Data::new((0..rng.gen_range(0..16)).map(|_| rng.gen()).collect()),
    );
    let mut record = StoredBlockRecord::new(block);

    for _ in 0..rng.gen_range(1..4) {
        record.siacoin_output_diffs.push(SiacoinOutputDiff {
            direction: random_direction(&mut rng),
            id: OutputID::new(rng.gen()),
            output: SiacoinOutput {
                value: Currency::new(rng.gen()),
                unlock_hash: UnlockHash::new(rng.gen()),
            },
        });
        record.file_contract_diffs.push(FileContractDiff {
            direction: random_direction(&mut rng),
            id: FileContractID::new(rng.gen()),
            file_contract: FileContract {
                file_size: rng.gen(),
                file_merkle_root: rng.gen(),
                window_start: BlockHeight::new(rng.gen_range(0..1000)),
                window_end: BlockHeight::new(rng.gen_range(1000..2000)),
                payout: Currency::new(rng.gen()),
                unlock_hash: UnlockHash::new(rng.gen()),
                revision_number: rng.gen(),
            },
        });
        record.siafund_output_diffs.push(SiafundOutputDiff {
            direction: random_direction(&mut rng),
            id: OutputID::new(rng.gen()),
            output: SiafundOutput {
                value: Currency::new(rng.gen()),
                unlock_hash: UnlockHash::new(rng.gen()),
                claim_start: Currency::new(rng.gen()),
            },
        });
        record.delayed_siacoin_output_diffs.push(DelayedSiacoinOutputDiff {
            direction: random_direction(&mut rng),
            id: OutputID::new(rng.gen()),
            output: SiacoinOutput {
                value: Currency::new(rng.gen()),
                unlock_hash: UnlockHash::new(rng.gen()),
            },
            maturity_height: BlockHeight::new(rng.gen_range(0..1000)),
        });
    }

    // Always store pool diffs in both directions.
    let previous = Currency::new(rng.gen_range(0..u64::MAX as u128));
    let adjusted = Currency::new(previous.int() + rng.gen_range(1..1000));
    record.siafund_pool_diffs.push(SiafundPoolDiff {
        direction: DiffDirection::Apply,
        previous,
        adjusted,
    });
    record.siafund_pool_diffs.push(SiafundPoolDiff {
        direction: DiffDirection::Revert,
        previous: adjusted,
        adjusted: previous,
    });

    record
}

fn random_direction<R: Rng>(rng: &mut R) -> DiffDirection {
    if rng.gen_bool(0.5) {
        DiffDirection::Apply
    } else {
        DiffDirection::Revert
    }
}

/// The consensus change that applying `records` in order without reverting anything should produce.
pub(crate) fn applied_change(records: &[&StoredBlockRecord]) -> ConsensusChange {
    let mut change = ConsensusChange::default();
    for record in records {
        let record = (*record).clone();
        change.applied_blocks.push(record.block);
        change.siacoin_output_diffs.extend(record.siacoin_output_diffs);
        change.file_contract_diffs.extend(record.file_contract_diffs);
        change.siafund_output_diffs.extend(record.siafund_output_diffs);
        change
            .delayed_siacoin_output_diffs
            .extend(record.delayed_siacoin_output_diffs);
        change.siafund_pool_diffs.extend(record.siafund_pool_diffs);
    }
    change
}

/// Tracks the best path the way an acceptance engine would, and produces the write batch and change
/// entry for every extension or reorg of that path.
pub(crate) struct TestChain {
    path: Vec<BlockID>,
    records: HashMap<BlockID, StoredBlockRecord>,
    next_nonce: u64,
}

impl TestChain {
    pub(crate) fn new(genesis: &StoredBlockRecord) -> TestChain {
        let mut records = HashMap::new();
        records.insert(genesis.id(), genesis.clone());
        TestChain {
            path: vec![genesis.id()],
            records,
            next_nonce: 1,
        }
    }

    pub(crate) fn path(&self) -> &[BlockID] {
        &self.path
    }

    pub(crate) fn tip(&self) -> BlockID {
        self.path[self.path.len() - 1]
    }

    pub(crate) fn record(&self, block: &BlockID) -> &StoredBlockRecord {
        &self.records[block]
    }

    /// Apply `count` new blocks on top of the tip.
    pub(crate) fn extend(&mut self, count: usize) -> (BlockStoreWriteBatch<MemWriteBatch>, ChangeEntry) {
        self.reorg(0, count)
    }

    /// Revert the `revert` highest blocks, starting from the tip, then apply `apply` new blocks on top of
    /// what is left.
    pub(crate) fn reorg(
        &mut self,
        revert: usize,
        apply: usize,
    ) -> (BlockStoreWriteBatch<MemWriteBatch>, ChangeEntry) {
        assert!(revert < self.path.len(), "cannot revert the genesis block");
        let mut wb = BlockStoreWriteBatch::new();

        let reverted_blocks: Vec<BlockID> = (0..revert)
            .map(|_| self.path.pop().unwrap())
            .collect();
        let old_height = self.path.len() + revert - 1;

        let mut applied_blocks = Vec::with_capacity(apply);
        for _ in 0..apply {
            let record = random_record(self.tip(), self.next_nonce);
            self.next_nonce += 1;

            let block = wb.set_block_record(&record).unwrap();
            wb.set_path_at_height(BlockHeight::new(self.path.len() as u64), &block)
                .unwrap();
            self.records.insert(block, record);
            self.path.push(block);
            applied_blocks.push(block);
        }

        let new_height = self.path.len() - 1;
        for height in (new_height + 1)..=old_height {
            wb.delete_path_at_height(BlockHeight::new(height as u64));
        }
        wb.set_current_height(BlockHeight::new(new_height as u64))
            .unwrap();

        (wb, ChangeEntry::new(reverted_blocks, applied_blocks))
    }
}
