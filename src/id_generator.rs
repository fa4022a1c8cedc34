// Snowflake-style document ids with embedded shard information.
// 64-bit layout: [timestamp:42][shard_id:10][sequence:12]

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::store::Id;

/// Generates unique ids for every collection of the document store. A single
/// node runs one generator on shard 0; the shard bits keep ids unique if the
/// store is ever split.
#[derive(Debug)]
pub struct IdGenerator {
    shard_id: u16,
    sequence: AtomicU64,
    last_timestamp: AtomicU64,
}

impl IdGenerator {
    pub fn new(shard_id: u16) -> Self {
        assert!(shard_id < 1024, "Shard ID must be less than 1024");

        Self {
            shard_id,
            sequence: AtomicU64::new(0),
            last_timestamp: AtomicU64::new(0),
        }
    }

    /// Generate the next unique id. Ids are strictly increasing per shard,
    /// which gives `read_one` its deterministic insertion order.
    pub fn next_id(&self) -> Id {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as u64;

        let last_ts = self.last_timestamp.load(Ordering::Relaxed);

        let sequence = if now == last_ts {
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            if seq >= 4096 {
                // Sequence overflow - wait for the next millisecond
                std::thread::sleep(std::time::Duration::from_millis(1));
                self.sequence.store(0, Ordering::Relaxed);
                return self.next_id();
            }
            seq
        } else {
            self.last_timestamp.store(now, Ordering::Relaxed);
            self.sequence.store(1, Ordering::Relaxed);
            0
        };

        let id = ((now & 0x3FF_FFFF_FFFF) << 22)
            | ((self.shard_id as u64) << 12)
            | (sequence & 0xFFF);

        id as Id
    }

    pub fn extract_shard_id(id: Id) -> u16 {
        ((id as u64) >> 12 & 0x3FF) as u16
    }

    pub fn extract_timestamp(id: Id) -> u64 {
        (id as u64) >> 22
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let gen = IdGenerator::new(0);
        let mut last = 0;
        for _ in 0..10_000 {
            let id = gen.next_id();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn shard_round_trips() {
        let gen = IdGenerator::new(7);
        let id = gen.next_id();
        assert_eq!(IdGenerator::extract_shard_id(id), 7);
    }
}
