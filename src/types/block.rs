/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the 'block' type and its associated methods.

use borsh::{BorshDeserialize, BorshSerialize};
pub use sha2::Sha256 as CryptoHasher;
use sha2::Digest;

use super::data_types::{BlockID, Data};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Block {
    pub parent_id: BlockID,
    pub nonce: u64,
    pub timestamp: u64,
    pub data: Data,
}

impl Block {
    pub fn new(parent_id: BlockID, nonce: u64, timestamp: u64, data: Data) -> Block {
        Block {
            parent_id,
            nonce,
            timestamp,
            data,
        }
    }

    /// Compute the identifier of this block: the SHA256 hash of the Borsh serialization of all of its
    /// fields.
    pub fn id(&self) -> BlockID {
        let mut hasher = CryptoHasher::new();
        // Safety: Borsh serialization of fixed-layout structs into a Vec cannot fail.
        hasher.update(&self.parent_id.try_to_vec().unwrap());
        hasher.update(&self.nonce.try_to_vec().unwrap());
        hasher.update(&self.timestamp.try_to_vec().unwrap());
        hasher.update(&self.data.try_to_vec().unwrap());
        BlockID::new(hasher.finalize().into())
    }
}
