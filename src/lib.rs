/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A library that turns the block acceptance and reorganization decisions of a consensus engine into
//! an ordered, replayable stream of [consensus changes](types::change::ConsensusChange).
//!
//! The central type is [`ConsensusSet`](consensus_set::ConsensusSet). An external acceptance engine
//! (fork choice, block validation) stages block records into a
//! [write batch](block_store::accessors::internal::BlockStoreWriteBatch) and hands it to
//! [`apply_change`](consensus_set::ConsensusSet::apply_change) together with a
//! [change entry](types::change::ChangeEntry) naming the blocks that were reverted and applied. The
//! consensus set records the entry in its append-only change log, and immediately
//! pushes the fully materialized change to every [subscriber](subscribers).
//!
//! Subscribers that join late are backfilled with the whole history before they receive live
//! changes, so every subscriber sees every change exactly once and in order.
//!
//! ## Starting a consensus set
//!
//! ```ignore
//! ConsensusSet::initialize(kv_store.clone(), &genesis_record)?;
//!
//! let consensus_set =
//!     ConsensusSetSpec::builder()
//!     .kv_store(kv_store)
//!     .configuration(configuration)
//!     .on_append_change(append_handler)
//!     .build()
//!     .start()?;
//! ```

pub mod block_store;

pub(crate) mod change_log;

pub(crate) mod change_computer;

pub mod consensus_set;

pub(crate) mod event_bus;

pub mod events;

pub(crate) mod logging;

pub mod subscribers;

pub mod types;
