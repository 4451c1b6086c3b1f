/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Directional state diffs.
//!
//! When a block is first applied to the consensus state, the acceptance engine records every state
//! mutation the block caused as a sequence of diffs, in the order the mutations happened. These are
//! stored next to the block in its [`StoredBlockRecord`](super::block_record::StoredBlockRecord), and
//! are never copied into the [change log](crate::change_log).
//!
//! Every diff carries a [`DiffDirection`]. For the first four kinds of diffs, `Apply` means "the object
//! comes into existence" and `Revert` means "the object is removed". [`SiafundPoolDiff`]s are different:
//! the siafund pool is a single accumulating quantity, so a pool diff describes an adjustment
//! from `previous` to `adjusted`, and its direction says which of those two values is current after the
//! diff is processed.

use borsh::{BorshDeserialize, BorshSerialize};

use super::data_types::{BlockHeight, Currency, FileContractID, OutputID, UnlockHash};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum DiffDirection {
    Apply,
    Revert,
}

impl DiffDirection {
    /// Get the opposite direction.
    pub const fn inverse(&self) -> DiffDirection {
        match self {
            DiffDirection::Apply => DiffDirection::Revert,
            DiffDirection::Revert => DiffDirection::Apply,
        }
    }
}

/// Implemented by every kind of diff so that diffs can be replayed generically.
pub trait DirectionalDiff: Clone {
    fn direction(&self) -> DiffDirection;
    fn set_direction(&mut self, direction: DiffDirection);
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SiacoinOutput {
    pub value: Currency,
    pub unlock_hash: UnlockHash,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SiacoinOutputDiff {
    pub direction: DiffDirection,
    pub id: OutputID,
    pub output: SiacoinOutput,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FileContract {
    pub file_size: u64,
    pub file_merkle_root: [u8; 32],
    pub window_start: BlockHeight,
    pub window_end: BlockHeight,
    pub payout: Currency,
    pub unlock_hash: UnlockHash,
    pub revision_number: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FileContractDiff {
    pub direction: DiffDirection,
    pub id: FileContractID,
    pub file_contract: FileContract,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SiafundOutput {
    pub value: Currency,
    pub unlock_hash: UnlockHash,
    /// Value of the siafund pool when this output was created.
    pub claim_start: Currency,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SiafundOutputDiff {
    pub direction: DiffDirection,
    pub id: OutputID,
    pub output: SiafundOutput,
}

/// A siacoin output that cannot be spent until `maturity_height` (e.g., miner payouts).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DelayedSiacoinOutputDiff {
    pub direction: DiffDirection,
    pub id: OutputID,
    pub output: SiacoinOutput,
    pub maturity_height: BlockHeight,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SiafundPoolDiff {
    pub direction: DiffDirection,
    pub previous: Currency,
    pub adjusted: Currency,
}

impl DirectionalDiff for SiacoinOutputDiff {
    fn direction(&self) -> DiffDirection {
        self.direction
    }

    fn set_direction(&mut self, direction: DiffDirection) {
        self.direction = direction
    }
}

impl DirectionalDiff for FileContractDiff {
    fn direction(&self) -> DiffDirection {
        self.direction
    }

    fn set_direction(&mut self, direction: DiffDirection) {
        self.direction = direction
    }
}

impl DirectionalDiff for SiafundOutputDiff {
    fn direction(&self) -> DiffDirection {
        self.direction
    }

    fn set_direction(&mut self, direction: DiffDirection) {
        self.direction = direction
    }
}

impl DirectionalDiff for DelayedSiacoinOutputDiff {
    fn direction(&self) -> DiffDirection {
        self.direction
    }

    fn set_direction(&mut self, direction: DiffDirection) {
        self.direction = direction
    }
}

impl DirectionalDiff for SiafundPoolDiff {
    fn direction(&self) -> DiffDirection {
        self.direction
    }

    fn set_direction(&mut self, direction: DiffDirection) {
        self.direction = direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_flips_direction() {
        assert_eq!(DiffDirection::Apply.inverse(), DiffDirection::Revert);
        assert_eq!(DiffDirection::Revert.inverse(), DiffDirection::Apply);
        assert_eq!(DiffDirection::Apply.inverse().inverse(), DiffDirection::Apply);
    }
}
