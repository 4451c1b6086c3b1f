//! Subscribers that remember everything they receive.

use std::sync::Mutex;

use consensus_set::{
    subscribers::{ConsensusSetDigestSubscriber, ConsensusSetSubscriber},
    types::{change::ConsensusChange, data_types::BlockID},
};

#[derive(Default)]
pub(crate) struct ChangeRecorder(Mutex<Vec<ConsensusChange>>);

impl ChangeRecorder {
    pub(crate) fn changes(&self) -> Vec<ConsensusChange> {
        self.0.lock().unwrap().clone()
    }
}

impl ConsensusSetSubscriber for ChangeRecorder {
    fn process_consensus_change(&self, change: &ConsensusChange) {
        self.0.lock().unwrap().push(change.clone())
    }
}

pub(crate) type Digest = (Vec<BlockID>, Vec<BlockID>);

#[derive(Default)]
pub(crate) struct DigestRecorder(Mutex<Vec<Digest>>);

impl DigestRecorder {
    pub(crate) fn digests(&self) -> Vec<Digest> {
        self.0.lock().unwrap().clone()
    }
}

impl ConsensusSetDigestSubscriber for DigestRecorder {
    fn process_consensus_digest(&self, reverted: &[BlockID], applied: &[BlockID]) {
        self.0
            .lock()
            .unwrap()
            .push((reverted.to_vec(), applied.to_vec()))
    }
}
