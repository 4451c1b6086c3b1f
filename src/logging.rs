/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the consensus set's
//! [configuration](crate::consensus_set::Configuration).
//!
//! This library logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how an [AppendChange](crate::events::AppendChangeEvent) is printed:
//!
//! ```text
//! AppendChange, 1701329264, 2, [fNGCJyk], [Id5u7f6 q0Zk3Ab]
//! ```
//!
//! In the snippet:
//! - The third value is the index of the new change log entry.
//! - The fourth and fifth values are the reverted and applied blocks, each block ID abbreviated to the
//!   first seven characters of its Base64 encoding.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use std::time::SystemTime;

use crate::{events::*, types::data_types::BlockID};

// Names of each event in PascalCase for printing:
pub const APPEND_CHANGE: &str = "AppendChange";
pub const REJECT_CHANGE: &str = "RejectChange";
pub const NOTIFY_SUBSCRIBERS: &str = "NotifySubscribers";
pub const SUBSCRIBE: &str = "Subscribe";
pub const DIGEST_SUBSCRIBE: &str = "DigestSubscribe";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for AppendChangeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |append_change_event: &AppendChangeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                APPEND_CHANGE,
                secs_since_unix_epoch(append_change_event.timestamp),
                append_change_event.index,
                block_ids_info(&append_change_event.entry.reverted_blocks),
                block_ids_info(&append_change_event.entry.applied_blocks)
            )
        };
        Box::new(logger)
    }
}

impl Logger for RejectChangeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reject_change_event: &RejectChangeEvent| {
            log::warn!(
                "{}, {}, {}, {}, {}",
                REJECT_CHANGE,
                secs_since_unix_epoch(reject_change_event.timestamp),
                block_ids_info(&reject_change_event.entry.reverted_blocks),
                block_ids_info(&reject_change_event.entry.applied_blocks),
                match &reject_change_event.block {
                    Some(block) => first_seven_base64_chars(&block.bytes()),
                    None => String::from("-"),
                }
            )
        };
        Box::new(logger)
    }
}

impl Logger for NotifySubscribersEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |notify_subscribers_event: &NotifySubscribersEvent| {
            log::debug!(
                "{}, {}, {}, {}, {}",
                NOTIFY_SUBSCRIBERS,
                secs_since_unix_epoch(notify_subscribers_event.timestamp),
                notify_subscribers_event.index,
                notify_subscribers_event.subscribers,
                notify_subscribers_event.digest_subscribers
            )
        };
        Box::new(logger)
    }
}

impl Logger for SubscribeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |subscribe_event: &SubscribeEvent| {
            log::info!(
                "{}, {}, {}, {}",
                SUBSCRIBE,
                secs_since_unix_epoch(subscribe_event.timestamp),
                subscribe_event.start,
                subscribe_event.backfilled
            )
        };
        Box::new(logger)
    }
}

impl Logger for DigestSubscribeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |digest_subscribe_event: &DigestSubscribeEvent| {
            log::info!(
                "{}, {}, {}",
                DIGEST_SUBSCRIBE,
                secs_since_unix_epoch(digest_subscribe_event.timestamp),
                digest_subscribe_event.current_height
            )
        };
        Box::new(logger)
    }
}

pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn block_ids_info(blocks: &[BlockID]) -> String {
    let abbreviated: Vec<String> = blocks
        .iter()
        .map(|block| first_seven_base64_chars(&block.bytes()))
        .collect();
    format!("[{}]", abbreviated.join(" "))
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_ids_are_abbreviated() {
        assert_eq!(first_seven_base64_chars(&[0; 32]), "AAAAAAA");
        assert_eq!(first_seven_base64_chars(&[0; 3]), "AAAA");
        assert_eq!(
            block_ids_info(&[BlockID::new([0; 32]), BlockID::new([255; 32])]),
            "[AAAAAAA _______]".replace('_', "/")
        );
        assert_eq!(block_ids_info(&[]), "[]");
    }
}
