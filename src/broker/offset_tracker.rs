use std::collections::HashMap;

/// Committed positions: (group, topic) -> partition -> next offset to read.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    store: HashMap<(String, String), HashMap<u32, u64>>,
}

impl OffsetTracker {
    pub fn commit(&mut self, group: &str, topic: &str, partition: u32, offset: u64) {
        self.store
            .entry((group.to_string(), topic.to_string()))
            .or_default()
            .insert(partition, offset);
    }

    pub fn fetch(&self, group: &str, topic: &str, partition: u32) -> Option<u64> {
        self.store
            .get(&(group.to_string(), topic.to_string()))
            .and_then(|m| m.get(&partition))
            .copied()
    }
}
