//! In-memory sequencer registry.

use crate::ports::outbound::SequencerRegistry;
use parking_lot::RwLock;
use shared_types::{Address, SequencerInfo};
use std::collections::HashMap;

/// Registry backed by an in-memory map. Production deployments wire the
/// discovery subsystem behind the same port.
#[derive(Default)]
pub struct InMemorySequencerRegistry {
    sequencers: RwLock<HashMap<Address, SequencerInfo>>,
}

impl InMemorySequencerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, info: SequencerInfo) {
        self.sequencers.write().insert(info.address, info);
    }

    pub fn deregister(&self, address: &Address) {
        self.sequencers.write().remove(address);
    }

    pub fn len(&self) -> usize {
        self.sequencers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequencers.read().is_empty()
    }
}

impl SequencerRegistry for InMemorySequencerRegistry {
    fn eligible_sequencers(&self) -> Result<Vec<SequencerInfo>, String> {
        Ok(self.sequencers.read().values().cloned().collect())
    }

    fn sequencer_info(&self, address: &Address) -> Result<Option<SequencerInfo>, String> {
        Ok(self.sequencers.read().get(address).cloned())
    }
}
