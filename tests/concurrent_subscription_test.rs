use std::{
    sync::{Arc, Barrier},
    thread,
    time::Duration,
};

use consensus_set::{
    consensus_set::ConsensusSet,
    types::{change::ConsensusChange, data_types::ChangeIndex},
};
use log::LevelFilter;
use rand::Rng;

mod common;

use crate::common::{
    chain::{genesis, start_consensus_set, TestChain},
    logging::setup_logger,
    mem_db::MemDB,
    recorders::{ChangeRecorder, DigestRecorder},
};

const APPENDS: usize = 60;
const SUBSCRIBERS: usize = 6;

/// Subscribers that join while changes are being appended on another thread must still see every
/// change exactly once, in order.
#[test]
fn concurrent_subscription_test() {
    setup_logger(LevelFilter::Info);

    // 1. Initialize a consensus set with a few changes in its log.
    let kv_store = MemDB::new();
    ConsensusSet::initialize(kv_store.clone(), &genesis()).unwrap();
    let consensus_set = Arc::new(start_consensus_set(kv_store));
    let mut chain = TestChain::new(&genesis());
    for _ in 0..3 {
        let (wb, entry) = chain.extend(1);
        consensus_set.apply_change(wb, entry).unwrap();
    }

    let start = Arc::new(Barrier::new(SUBSCRIBERS + 1));

    // 2. Append extensions and reorgs on one thread.
    let appender = {
        let consensus_set = consensus_set.clone();
        let start = start.clone();
        thread::spawn(move || {
            start.wait();
            let mut rng = rand::thread_rng();
            for _ in 0..APPENDS {
                let (wb, entry) = if rng.gen_bool(0.3) && chain.path().len() > 2 {
                    chain.reorg(rng.gen_range(1..chain.path().len().min(4)), rng.gen_range(1..4))
                } else {
                    chain.extend(rng.gen_range(1..3))
                };
                consensus_set.apply_change(wb, entry).unwrap();
            }
            chain
        })
    };

    // 3. Meanwhile, subscribe at random moments on other threads.
    let subscribers: Vec<_> = (0..SUBSCRIBERS)
        .map(|i| {
            let consensus_set = consensus_set.clone();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                thread::sleep(Duration::from_millis(rand::thread_rng().gen_range(0..20)));
                if i % 2 == 0 {
                    let recorder = Arc::new(ChangeRecorder::default());
                    consensus_set.subscribe(recorder.clone()).unwrap();
                    (Some(recorder), None)
                } else {
                    let recorder = Arc::new(DigestRecorder::default());
                    consensus_set.digest_subscribe(recorder.clone()).unwrap();
                    (None, Some(recorder))
                }
            })
        })
        .collect();

    let chain = appender.join().unwrap();
    let recorders: Vec<_> = subscribers
        .into_iter()
        .map(|subscriber| subscriber.join().unwrap())
        .collect();

    // 4. Every full subscriber has exactly the whole history.
    let len = consensus_set.change_log_len();
    assert_eq!(len, 3 + APPENDS as u64);
    let history: Vec<ConsensusChange> = (0..len)
        .map(|i| consensus_set.consensus_change(ChangeIndex::new(i)).unwrap())
        .collect();
    for (changes, _) in &recorders {
        if let Some(changes) = changes {
            assert_eq!(changes.changes(), history);
        }
    }

    // 5. Replaying the digests of every digest subscriber from its baseline ends on the best path.
    for (_, digests) in &recorders {
        if let Some(digests) = digests {
            let mut path = Vec::new();
            for (reverted, applied) in digests.digests() {
                for block in reverted {
                    assert_eq!(path.pop(), Some(block));
                }
                path.extend(applied);
            }
            assert_eq!(path, chain.path());
        }
    }
}
