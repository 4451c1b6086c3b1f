/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits implemented by the consumers of consensus changes, and the registry that delivers changes to
//! them.
//!
//! ## Two kinds of subscribers
//!
//! 1. [`ConsensusSetSubscriber`]s receive every [`ConsensusChange`] in full, including every diff. When
//!    they [subscribe](crate::consensus_set::ConsensusSet::subscribe), they are first sent every change
//!    in the change log.
//! 2. [`ConsensusSetDigestSubscriber`]s only receive the IDs of the reverted and applied blocks. When
//!    they [subscribe](crate::consensus_set::ConsensusSet::digest_subscribe), they are first sent a single
//!    digest that applies the whole current best path, after which every digest is a delta.
//!
//! ## Calling context
//!
//! Both traits' methods are called synchronously, on the thread that appended the change, while the
//! consensus set holds a shared lock. A subscriber that takes long to return delays the next append.
//! Subscribers may query the consensus set (e.g., with
//! [`consensus_change`](crate::consensus_set::ConsensusSet::consensus_change)) from inside these
//! methods, but must never append to it or subscribe to it, since that would deadlock.
//!
//! Both traits are implemented for closures with matching signatures.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::types::{change::ConsensusChange, data_types::BlockID};

pub trait ConsensusSetSubscriber: Send + Sync {
    fn process_consensus_change(&self, change: &ConsensusChange);
}

pub trait ConsensusSetDigestSubscriber: Send + Sync {
    fn process_consensus_digest(&self, reverted: &[BlockID], applied: &[BlockID]);
}

impl<F: Fn(&ConsensusChange) + Send + Sync> ConsensusSetSubscriber for F {
    fn process_consensus_change(&self, change: &ConsensusChange) {
        self(change)
    }
}

impl<F: Fn(&[BlockID], &[BlockID]) + Send + Sync> ConsensusSetDigestSubscriber for F {
    fn process_consensus_digest(&self, reverted: &[BlockID], applied: &[BlockID]) {
        self(reverted, applied)
    }
}

/// A subscriber in the registry. Only active registrations are sent changes.
struct Registration<S: ?Sized> {
    subscriber: Arc<S>,
    active: Arc<AtomicBool>,
}

impl<S: ?Sized> Registration<S> {
    fn new(subscriber: Arc<S>) -> (Registration<S>, RegistrationHandle) {
        let active = Arc::new(AtomicBool::new(true));
        let handle = RegistrationHandle(active.clone());
        (Registration { subscriber, active }, handle)
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Returned on registration. Deactivating a registration only needs a shared reference to the registry,
/// so that it can be done while the consensus set's lock is downgraded.
pub(crate) struct RegistrationHandle(Arc<AtomicBool>);

impl RegistrationHandle {
    /// Stop sending changes to the subscriber for good. Used when its backfill fails, since any later
    /// change would leave a gap in what it has seen.
    pub(crate) fn deactivate(&self) {
        self.0.store(false, Ordering::Release)
    }
}

/// The subscribers of one consensus set, in registration order.
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    subscribers: Vec<Registration<dyn ConsensusSetSubscriber>>,
    digest_subscribers: Vec<Registration<dyn ConsensusSetDigestSubscriber>>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> SubscriberRegistry {
        SubscriberRegistry::default()
    }

    pub(crate) fn register(
        &mut self,
        subscriber: Arc<dyn ConsensusSetSubscriber>,
    ) -> RegistrationHandle {
        let (registration, handle) = Registration::new(subscriber);
        self.subscribers.push(registration);
        handle
    }

    pub(crate) fn register_digest(
        &mut self,
        subscriber: Arc<dyn ConsensusSetDigestSubscriber>,
    ) -> RegistrationHandle {
        let (registration, handle) = Registration::new(subscriber);
        self.digest_subscribers.push(registration);
        handle
    }

    /// Number of active subscribers.
    pub(crate) fn subscribers_count(&self) -> usize {
        self.subscribers.iter().filter(|r| r.is_active()).count()
    }

    /// Number of active digest subscribers.
    pub(crate) fn digest_subscribers_count(&self) -> usize {
        self.digest_subscribers
            .iter()
            .filter(|r| r.is_active())
            .count()
    }

    /// Send `change` to every active subscriber, then its digest to every active digest subscriber.
    pub(crate) fn notify(&self, change: &ConsensusChange) {
        for registration in self.subscribers.iter().filter(|r| r.is_active()) {
            registration.subscriber.process_consensus_change(change);
        }

        if self.digest_subscribers_count() == 0 {
            return;
        }
        let reverted = change.reverted_block_ids();
        let applied = change.applied_block_ids();
        for registration in self.digest_subscribers.iter().filter(|r| r.is_active()) {
            registration
                .subscriber
                .process_consensus_digest(&reverted, &applied);
        }
    }
}
