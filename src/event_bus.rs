/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Thread that receives [events](crate::events) from the consensus set and fires the handlers
//! registered for them.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::events::*;
use crate::logging::Logger;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

/// How long the event bus waits on the event channel before checking for the shutdown signal.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) struct EventHandlers {
    pub(crate) append_change_handlers: Vec<HandlerPtr<AppendChangeEvent>>,
    pub(crate) reject_change_handlers: Vec<HandlerPtr<RejectChangeEvent>>,
    pub(crate) notify_subscribers_handlers: Vec<HandlerPtr<NotifySubscribersEvent>>,
    pub(crate) subscribe_handlers: Vec<HandlerPtr<SubscribeEvent>>,
    pub(crate) digest_subscribe_handlers: Vec<HandlerPtr<DigestSubscribeEvent>>,
}

impl EventHandlers {
    /// Collect the user-defined handlers, and if `log_events` is set, the default logging handler of
    /// every event type.
    pub(crate) fn new(
        log_events: bool,
        append_change_handler: Option<HandlerPtr<AppendChangeEvent>>,
        reject_change_handler: Option<HandlerPtr<RejectChangeEvent>>,
        notify_subscribers_handler: Option<HandlerPtr<NotifySubscribersEvent>>,
        subscribe_handler: Option<HandlerPtr<SubscribeEvent>>,
        digest_subscribe_handler: Option<HandlerPtr<DigestSubscribeEvent>>,
    ) -> EventHandlers {
        EventHandlers {
            append_change_handlers: handlers(log_events, append_change_handler),
            reject_change_handlers: handlers(log_events, reject_change_handler),
            notify_subscribers_handlers: handlers(log_events, notify_subscribers_handler),
            subscribe_handlers: handlers(log_events, subscribe_handler),
            digest_subscribe_handlers: handlers(log_events, digest_subscribe_handler),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.append_change_handlers.is_empty()
            && self.reject_change_handlers.is_empty()
            && self.notify_subscribers_handlers.is_empty()
            && self.subscribe_handlers.is_empty()
            && self.digest_subscribe_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::AppendChange(append_change_event) => self
                .append_change_handlers
                .iter()
                .for_each(|handler| handler(&append_change_event)),

            Event::RejectChange(reject_change_event) => self
                .reject_change_handlers
                .iter()
                .for_each(|handler| handler(&reject_change_event)),

            Event::NotifySubscribers(notify_subscribers_event) => self
                .notify_subscribers_handlers
                .iter()
                .for_each(|handler| handler(&notify_subscribers_event)),

            Event::Subscribe(subscribe_event) => self
                .subscribe_handlers
                .iter()
                .for_each(|handler| handler(&subscribe_event)),

            Event::DigestSubscribe(digest_subscribe_event) => self
                .digest_subscribe_handlers
                .iter()
                .for_each(|handler| handler(&digest_subscribe_event)),
        }
    }
}

fn handlers<T: Logger>(log_events: bool, user_handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
    let mut handlers = Vec::new();
    if log_events {
        handlers.push(T::get_logger());
    }
    if let Some(handler) = user_handler {
        handlers.push(handler);
    }
    handlers
}

/// Start the event bus thread.
///
/// On receiving `shutdown_signal`, the thread fires the handlers of every event still in the channel
/// and then exits, so every event published before shutdown is handled.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                while let Ok(event) = event_subscriber.try_recv() {
                    event_handlers.fire_handlers(event)
                }
                return;
            }
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return,
        }
    })
}
