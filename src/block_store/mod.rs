/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The persistent state read and written by a consensus set.
//!
//! # The Block Store
//!
//! The Block Store holds three things:
//! 1. **Block Records**: every block that was ever applied, together with the diffs it produced when it
//!    was first applied. Records are kept even after their block is reverted, so that the revert can be
//!    replayed to late subscribers.
//! 2. **The Best Path**: the ID of the block at every height of the current best chain, and the current
//!    height.
//! 3. **The Change Log**: the sequence of [change entries](crate::types::change::ChangeEntry) that the
//!    consensus set has recorded. A running consensus set also keeps them in memory.
//!
//! The documentation for the [`variables`] submodule lists exactly how these are laid out.
//!
//! # Pluggable persistence
//!
//! - The block store is kept in persistent storage, most probably in the host's filesystem.
//! - Library users get to choose how exactly this is done.
//! - This library merely requires that whatever the user provides as a persistence mechanism implements
//!   the abstract functionality of a key-value store with atomic, batched writes and consistent
//!   snapshots.
//! - This abstract functionality is made concrete by the traits defined in the [`pluggables`] module.
//!
//! # Accessing the Block Store
//!
//! Implementations of the pluggable persistence traits get wrapped inside block store [`accessors`].
//! These put the block store variables in the right places in the KVStore and provide typed methods for
//! reading and writing them.

pub mod accessors;

pub mod pluggables;

pub mod variables;
