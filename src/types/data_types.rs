/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes or numbers, and do not have any major "active" behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::Hash,
    ops::{Add, AddAssign},
};

use borsh::{BorshDeserialize, BorshSerialize};

/// 32-byte identifier of a [`Block`](super::block::Block).
///
/// Block IDs are the keys under which [stored block records](super::block_record::StoredBlockRecord)
/// live in the [block store](crate::block_store), and the elements of
/// [change entries](super::change::ChangeEntry). A `BlockID` is always the SHA256 hash computed by
/// [`Block::id`](super::block::Block::id).
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct BlockID([u8; 32]);

impl BlockID {
    /// Create a new `BlockID` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 32]` value of this `BlockID`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for BlockID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Debug for BlockID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Height of a block in the best chain.
///
/// Starts at 0 for the genesis block and increases by 1 for every block on the path towards the
/// current head.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, BorshDeserialize, BorshSerialize)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Create a new `BlockHeight` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `BlockHeight`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the little-endian representation of the inner `u64` value of this `BlockHeight`.
    pub fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl AddAssign<u64> for BlockHeight {
    fn add_assign(&mut self, rhs: u64) {
        self.0.add_assign(rhs)
    }
}

impl Add<u64> for BlockHeight {
    type Output = BlockHeight;
    fn add(self, rhs: u64) -> Self::Output {
        BlockHeight::new(self.0.add(rhs))
    }
}

/// Position of an entry in the change log.
///
/// Change indices are stable sequence numbers, not cursors: index `i` denotes the same change entry for
/// the whole lifetime of a block store, so they are safe to cache outside of this library, for example
/// to resume a subscription with [`subscribe_from`](crate::consensus_set::ConsensusSet::subscribe_from).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct ChangeIndex(u64);

impl ChangeIndex {
    /// Create a new `ChangeIndex` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `ChangeIndex`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the little-endian representation of the inner `u64` value of this `ChangeIndex`.
    pub fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl Display for ChangeIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl Add<u64> for ChangeIndex {
    type Output = ChangeIndex;
    fn add(self, rhs: u64) -> Self::Output {
        ChangeIndex::new(self.0.add(rhs))
    }
}

/// An amount of siacoins or siafunds, in the smallest indivisible unit.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct Currency(u128);

impl Currency {
    pub const fn new(int: u128) -> Self {
        Self(int)
    }

    pub const fn int(&self) -> u128 {
        self.0
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Identifier of a siacoin output, delayed siacoin output, or siafund output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct OutputID([u8; 32]);

impl OutputID {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

/// Identifier of a file contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct FileContractID([u8; 32]);

impl FileContractID {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

/// Hash of the conditions that must be met to spend an output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct UnlockHash([u8; 32]);

impl UnlockHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

/// Arbitrary bytes carried by a block (its transactions, encoded by the acceptance engine).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct Data(Vec<u8>);

impl Data {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}
