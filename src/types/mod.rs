/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that are used across the library and exposed to library users.

pub mod block;

pub mod block_record;

pub mod change;

pub mod data_types;

pub mod diffs;
