/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build, run, and initialize the storage of a consensus set.
//!
//! The key components of this module are:
//! - The builder-pattern interface to construct a [specification of the consensus set](ConsensusSetSpec)
//!   with:
//!   1. `ConsensusSetSpec::builder` to construct a `ConsensusSetSpecBuilder`,
//!   2. The setters of the `ConsensusSetSpecBuilder`, and
//!   3. The `ConsensusSetSpecBuilder::build` method to construct a [ConsensusSetSpec],
//! - The function to [start](ConsensusSetSpec::start) a [ConsensusSet] given its specification,
//! - The function to [initialize](ConsensusSet::initialize) the consensus set's
//!   [Block Store](crate::block_store),
//! - [The type](ConsensusSet) through which changes are appended, subscribed to, and queried.
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
//!     .on_reject_change(reject_handler)
//!     .build()
//!     .start()?;
//! ```
//!
//! ### Required setters
//!
//! - `.kv_store(...)`
//! - `.configuration(...)`
//!
//! ### Optional setters
//!
//! The optional setters are for registering user-defined event handlers for events from [crate::events]:
//! - `.on_append_change(...)`
//! - `.on_reject_change(...)`
//! - `.on_notify_subscribers(...)`
//! - `.on_subscribe(...)`
//! - `.on_digest_subscribe(...)`
//!
//! ## Locking
//!
//! Every operation on a consensus set goes through a single read-write lock.
//!
//! [`apply_change`](ConsensusSet::apply_change) takes the lock exclusively to write the new entry, then
//! atomically downgrades it to a shared lock while subscribers are notified. Since the lock is never
//! released in between, no other append can slip in before every subscriber has seen the change, but
//! [`consensus_change`](ConsensusSet::consensus_change) and the backfill of other subscriptions can
//! proceed while a slow subscriber is being notified.
//!
//! [`subscribe`](ConsensusSet::subscribe) and [`digest_subscribe`](ConsensusSet::digest_subscribe) do the
//! same: they register the subscriber under the exclusive lock and backfill it under the downgraded
//! shared lock. A change is therefore either included in a new subscriber's backfill, or delivered to it
//! by a later notification, but never both and never neither. A subscriber whose backfill fails is
//! deactivated before the shared lock is released, so it never receives a change after a gap.

use std::fmt::Display;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::SystemTime;

use parking_lot::{RwLock, RwLockWriteGuard};
use typed_builder::TypedBuilder;

use crate::block_store::{
    accessors::{
        internal::{BlockStore, BlockStoreError, BlockStoreWriteBatch},
        public::BlockStoreCamera,
    },
    pluggables::KVStore,
};
use crate::change_computer::{compute_change, replay_entry, StagedBlockRecords};
use crate::change_log::ChangeLog;
use crate::event_bus::*;
use crate::events::*;
use crate::subscribers::{ConsensusSetDigestSubscriber, ConsensusSetSubscriber, SubscriberRegistry};
use crate::types::{
    block_record::StoredBlockRecord,
    change::{ChangeEntry, ConsensusChange},
    data_types::{BlockHeight, BlockID, ChangeIndex},
};

/// Stores the user-defined parameters required to start the consensus set, that is:
/// 1. The "Log Events" flag, if set to "true" then logs should be printed.
/// 2. The "Verify Block IDs" flag, if set to "true" then every block record read while computing a
///    consensus change is checked to contain the block it is stored under.
///
/// ## Log Events
///
/// This library logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.log_events(...)`

    Optional:
    - `.verify_block_ids(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
    #[builder(
        default = false,
        setter(doc = "Check that block records hold the block they are stored under? Optional, defaults to false.")
    )]
    pub verify_block_ids: bool,
}

/// Stores all necessary parameters and trait implementations required to run the [ConsensusSet].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ConsensusSetSpec]. On the builder call the following methods to construct a valid [ConsensusSetSpec].

    Required:
    - `.kv_store(...)`
    - `.configuration(...)`

    Optional:
    - `.on_append_change(...)`
    - `.on_reject_change(...)`
    - `.on_notify_subscribers(...)`
    - `.on_subscribe(...)`
    - `.on_digest_subscribe(...)`
"))]
pub struct ConsensusSetSpec<K: KVStore> {
    // Required parameters
    #[builder(setter(doc = "Set the implementation of the consensus set's Key-Value store. The argument must implement the [KVStore](crate::block_store::pluggables::KVStore) trait, and must have been [initialized](ConsensusSet::initialize). Required."))]
    kv_store: K,
    #[builder(setter(doc = "Set the [configuration](Configuration), which contains the necessary parameters to run a consensus set. Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default, setter(transform = |handler: impl Fn(&AppendChangeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<AppendChangeEvent>),
    doc = "Register a handler closure to be invoked after a change entry is appended to the change log. Optional."))]
    on_append_change: Option<HandlerPtr<AppendChangeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RejectChangeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RejectChangeEvent>),
    doc = "Register a handler closure to be invoked after a change entry is rejected. Optional."))]
    on_reject_change: Option<HandlerPtr<RejectChangeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&NotifySubscribersEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<NotifySubscribersEvent>),
    doc = "Register a handler closure to be invoked after every subscriber has received a new change. Optional."))]
    on_notify_subscribers: Option<HandlerPtr<NotifySubscribersEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SubscribeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SubscribeEvent>),
    doc = "Register a handler closure to be invoked after a subscriber is registered and backfilled. Optional."))]
    on_subscribe: Option<HandlerPtr<SubscribeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DigestSubscribeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DigestSubscribeEvent>),
    doc = "Register a handler closure to be invoked after a digest subscriber is registered and sent the current best path. Optional."))]
    on_digest_subscribe: Option<HandlerPtr<DigestSubscribeEvent>>,
}

impl<K: KVStore> ConsensusSetSpec<K> {
    /// Load the change log from the block store and start the event bus thread (if any event handler
    /// is registered), and return the running [ConsensusSet].
    pub fn start(self) -> Result<ConsensusSet<K>, ConsensusSetError> {
        let block_store = BlockStore::new(self.kv_store.clone());
        let change_log = ChangeLog::load(&block_store.snapshot())?;

        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_append_change,
            self.on_reject_change,
            self.on_notify_subscribers,
            self.on_subscribe,
            self.on_digest_subscribe,
        );

        let (event_publisher, event_bus, event_bus_shutdown) = if !event_handlers.is_empty() {
            let (event_publisher, event_subscriber) = mpsc::channel();
            let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
            let event_bus =
                start_event_bus(event_handlers, event_subscriber, event_bus_shutdown_receiver);
            (Some(event_publisher), Some(event_bus), Some(event_bus_shutdown))
        } else {
            (None, None, None)
        };

        Ok(ConsensusSet {
            state: RwLock::new(State {
                block_store,
                change_log,
                registry: SubscriberRegistry::new(),
            }),
            block_store_camera: BlockStoreCamera::new(self.kv_store),
            configuration: self.configuration,
            event_publisher,
            event_bus,
            event_bus_shutdown,
        })
    }
}

/// Everything that appends and notifications mutate, guarded together by one lock.
struct State<K: KVStore> {
    block_store: BlockStore<K>,
    change_log: ChangeLog,
    registry: SubscriberRegistry,
}

/// A running consensus set. When this value is dropped, the event bus thread is gracefully shut down
/// after handling every pending event.
pub struct ConsensusSet<K: KVStore> {
    state: RwLock<State<K>>,
    block_store_camera: BlockStoreCamera<K>,
    configuration: Configuration,
    event_publisher: Option<Sender<Event>>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl<K: KVStore> ConsensusSet<K> {
    /// Initializes the consensus set's [Block Store](crate::block_store) with `genesis` as the only block
    /// in the best path, and an empty change log.
    pub fn initialize(kv_store: K, genesis: &StoredBlockRecord) -> Result<(), BlockStoreError> {
        let mut block_store = BlockStore::new(kv_store);
        block_store.initialize(genesis)
    }

    /// Record that the blocks in `entry.reverted_blocks` were reverted and the blocks in
    /// `entry.applied_blocks` were applied, in that order, and push the resulting consensus change to
    /// every subscriber before returning.
    ///
    /// `write_batch` must contain the records of every newly applied block and the matching best path
    /// updates. It is written atomically together with the new change log entry.
    ///
    /// If the consensus change of `entry` cannot be computed (e.g., a block record is neither staged in
    /// `write_batch` nor stored), nothing is written, nothing is appended, and the error is returned.
    pub fn apply_change(
        &self,
        mut write_batch: BlockStoreWriteBatch<K::WriteBatch>,
        entry: ChangeEntry,
    ) -> Result<ChangeIndex, ConsensusSetError> {
        let mut state = self.state.write();

        let computed = {
            let snapshot = state.block_store.snapshot();
            let records = StagedBlockRecords::new(&snapshot, &write_batch);
            replay_entry(&records, &entry, self.configuration.verify_block_ids)
        };
        let change = match computed {
            Ok(change) => change,
            Err(err) => {
                let block = match &err {
                    ConsensusSetError::StoreInconsistency { block } => {
                        log::error!("Rejecting change entry referring to missing block {}", block);
                        Some(*block)
                    }
                    _ => None,
                };
                self.publish(Event::RejectChange(RejectChangeEvent {
                    timestamp: SystemTime::now(),
                    entry,
                    block,
                }));
                return Err(err);
            }
        };

        let index = state.change_log.next_index();
        write_batch.set_change_entry(index, &entry)?;
        write_batch.set_change_log_len(index.int() + 1)?;
        state.block_store.write(write_batch);
        state.change_log.push(entry.clone());

        self.publish(Event::AppendChange(AppendChangeEvent {
            timestamp: SystemTime::now(),
            index,
            entry,
        }));

        let state = RwLockWriteGuard::downgrade(state);
        state.registry.notify(&change);

        self.publish(Event::NotifySubscribers(NotifySubscribersEvent {
            timestamp: SystemTime::now(),
            index,
            subscribers: state.registry.subscribers_count(),
            digest_subscribers: state.registry.digest_subscribers_count(),
        }));

        Ok(index)
    }

    /// Register `subscriber`, and before returning, send it every change in the change log in order.
    /// After that, `subscriber` is sent every newly appended change.
    pub fn subscribe(
        &self,
        subscriber: Arc<dyn ConsensusSetSubscriber>,
    ) -> Result<(), ConsensusSetError> {
        self.subscribe_from(subscriber, ChangeIndex::new(0))
    }

    /// Like [`subscribe`](Self::subscribe), but only send the changes from `start` onwards, for
    /// subscribers that have already processed the changes before `start`.
    ///
    /// Returns `OutOfRange` without registering `subscriber` if `start` is greater than the length of
    /// the change log. If `start` equals the length, `subscriber` is registered without a backfill.
    ///
    /// If a change cannot be computed during the backfill, the error is returned and `subscriber` is
    /// never sent another change, since it could not line them up with what it has seen.
    pub fn subscribe_from(
        &self,
        subscriber: Arc<dyn ConsensusSetSubscriber>,
        start: ChangeIndex,
    ) -> Result<(), ConsensusSetError> {
        let mut state = self.state.write();
        let len = state.change_log.len();
        if start.int() > len {
            return Err(ConsensusSetError::OutOfRange { index: start, len });
        }
        let registration = state.registry.register(subscriber.clone());

        let state = RwLockWriteGuard::downgrade(state);
        let snapshot = state.block_store.snapshot();
        let mut backfilled = 0;
        for (index, entry) in state.change_log.iter_from(start) {
            let change = match replay_entry(&snapshot, entry, self.configuration.verify_block_ids) {
                Ok(change) => change,
                Err(err) => {
                    log::error!("Failed to backfill subscriber with change {}: {}", index, err);
                    registration.deactivate();
                    return Err(err);
                }
            };
            subscriber.process_consensus_change(&change);
            backfilled += 1;
        }

        self.publish(Event::Subscribe(SubscribeEvent {
            timestamp: SystemTime::now(),
            start,
            backfilled,
        }));

        Ok(())
    }

    /// Register `subscriber`, and before returning, send it a single digest that applies every block in
    /// the current best path, from genesis up to the current height. Every later digest is relative to
    /// that one.
    ///
    /// If the best path cannot be read, the error is returned and `subscriber` is never sent a digest.
    pub fn digest_subscribe(
        &self,
        subscriber: Arc<dyn ConsensusSetDigestSubscriber>,
    ) -> Result<(), ConsensusSetError> {
        let mut state = self.state.write();
        let registration = state.registry.register_digest(subscriber.clone());

        let state = RwLockWriteGuard::downgrade(state);
        let snapshot = state.block_store.snapshot();
        let path = match snapshot.current_path() {
            Ok(path) => path,
            Err(err) => {
                log::error!("Failed to send the best path to digest subscriber: {}", err);
                registration.deactivate();
                return Err(err.into());
            }
        };
        subscriber.process_consensus_digest(&[], &path);
        // The path runs from genesis up to and including the current height.
        let current_height = BlockHeight::new(path.len() as u64 - 1);

        self.publish(Event::DigestSubscribe(DigestSubscribeEvent {
            timestamp: SystemTime::now(),
            current_height,
        }));

        Ok(())
    }

    /// Compute the consensus change at `index` of the change log. The result is identical to what the
    /// subscribers were sent for that index.
    ///
    /// This may be called from inside subscriber callbacks.
    pub fn consensus_change(&self, index: ChangeIndex) -> Result<ConsensusChange, ConsensusSetError> {
        let state = self.state.read_recursive();
        let snapshot = state.block_store.snapshot();
        compute_change(
            &snapshot,
            &state.change_log,
            index,
            self.configuration.verify_block_ids,
        )
    }

    /// Get the number of entries in the change log.
    pub fn change_log_len(&self) -> u64 {
        self.state.read_recursive().change_log.len()
    }

    /// Returns a [Block Store Camera](BlockStoreCamera) which can be used to peek into the
    /// [Block Store](crate::block_store).
    pub fn block_store_camera(&self) -> &BlockStoreCamera<K> {
        &self.block_store_camera
    }

    fn publish(&self, event: Event) {
        Event::publish(&self.event_publisher, event)
    }
}

impl<K: KVStore> Drop for ConsensusSet<K> {
    fn drop(&mut self) {
        if let Some(shutdown) = self.event_bus_shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(event_bus) = self.event_bus.take() {
            if event_bus.join().is_err() {
                log::error!("Event bus thread panicked");
            }
        }
    }
}

#[derive(Debug)]
pub enum ConsensusSetError {
    /// `index` is not below `len`, the length of the change log.
    OutOfRange { index: ChangeIndex, len: u64 },

    /// The change log refers to `block`, but the block store has no (matching) record of it.
    StoreInconsistency { block: BlockID },

    BlockStoreError(BlockStoreError),
}

impl Display for ConsensusSetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsensusSetError::OutOfRange { index, len } => {
                write!(f, "change index {} out of range for change log of length {}", index, len)
            }
            ConsensusSetError::StoreInconsistency { block } => {
                write!(f, "block store has no consistent record of block {}", block)
            }
            ConsensusSetError::BlockStoreError(err) => write!(f, "{}", err),
        }
    }
}

impl From<BlockStoreError> for ConsensusSetError {
    fn from(value: BlockStoreError) -> Self {
        ConsensusSetError::BlockStoreError(value)
    }
}
