/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of consensus set events for event handling and logging.
//!
//! Note: an event for a given action indicates that the action has been completed.
//!
//! Events are published by the consensus set onto a channel and handled on a separate event bus
//! thread, so handlers (unlike [subscribers](crate::subscribers)) never delay appends. Handlers are
//! registered with the optional `on_*` setters of
//! [`ConsensusSetSpec`](crate::consensus_set::ConsensusSetSpec).

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::types::{
    change::ChangeEntry,
    data_types::{BlockHeight, BlockID, ChangeIndex},
};

pub enum Event {
    // Events that change the change log.
    AppendChange(AppendChangeEvent),
    RejectChange(RejectChangeEvent),
    // Events that involve delivering changes to subscribers.
    NotifySubscribers(NotifySubscribersEvent),
    Subscribe(SubscribeEvent),
    DigestSubscribe(DigestSubscribeEvent),
}

impl Event {
    pub(crate) fn publish(event_publisher: &Option<Sender<Event>>, event: Event) {
        if let Some(event_publisher) = event_publisher {
            // The event bus only goes away when the consensus set is dropped.
            let _ = event_publisher.send(event);
        }
    }
}

/// A change entry was written to the block store and appended to the change log.
pub struct AppendChangeEvent {
    pub timestamp: SystemTime,
    pub index: ChangeIndex,
    pub entry: ChangeEntry,
}

/// A change entry was refused because its consensus change could not be computed. Nothing was written.
pub struct RejectChangeEvent {
    pub timestamp: SystemTime,
    pub entry: ChangeEntry,
    /// The block whose record was missing or inconsistent, if that is why the entry was refused.
    pub block: Option<BlockID>,
}

/// The consensus change at `index` was delivered to every subscriber.
pub struct NotifySubscribersEvent {
    pub timestamp: SystemTime,
    pub index: ChangeIndex,
    pub subscribers: usize,
    pub digest_subscribers: usize,
}

/// A subscriber was registered and backfilled with the changes from `start` onwards.
pub struct SubscribeEvent {
    pub timestamp: SystemTime,
    pub start: ChangeIndex,
    pub backfilled: u64,
}

/// A digest subscriber was registered and sent the best path up to `current_height`.
pub struct DigestSubscribeEvent {
    pub timestamp: SystemTime,
    pub current_height: BlockHeight,
}
