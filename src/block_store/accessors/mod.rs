/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Typed wrappers around the user-provided [key-value store](super::pluggables::KVStore).
//!
//! - [`internal`]: the read-and-write handle owned by the consensus set, and the write batch the
//!   acceptance engine stages its writes into.
//! - [`public`]: read-only snapshots that can be taken from anywhere.

pub mod internal;

pub mod public;
