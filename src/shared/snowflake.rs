//! Snowflake ID Generator
//!
//! Twitter-style unique ID generation. Layout, high to low bits:
//! 42 bits of milliseconds since the configured epoch, 10 bits of machine
//! id, 12 bits of per-millisecond sequence.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Default epoch (2015-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1420070400000;

const MACHINE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MACHINE_MASK: u64 = (1 << MACHINE_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_SHIFT: u64 = MACHINE_BITS + SEQUENCE_BITS;

/// Snowflake ID generator.
///
/// IDs produced by one generator are strictly increasing, even when the
/// wall clock steps backwards or more than 4096 IDs are requested within a
/// single millisecond.
pub struct SnowflakeGenerator {
    machine_id: u64,
    epoch: u64,
    state: Mutex<GeneratorState>,
}

struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u16, epoch: u64) -> Self {
        Self {
            machine_id: machine_id as u64 & MACHINE_MASK,
            epoch,
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock();
        let mut timestamp = self.current_timestamp().max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond; borrow the next one.
                timestamp += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let id = (timestamp.saturating_sub(self.epoch) << TIMESTAMP_SHIFT)
            | (self.machine_id << SEQUENCE_BITS)
            | state.sequence;

        id as i64
    }

    /// Milliseconds since the Unix epoch at which `id` was minted.
    pub fn timestamp_of(&self, id: i64) -> u64 {
        ((id as u64) >> TIMESTAMP_SHIFT) + self.epoch
    }

    fn current_timestamp(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(self.epoch)
    }
}

/// Parse a snowflake from its decimal string form.
pub fn parse(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_generate_increasing() {
        let gen = SnowflakeGenerator::new(1, DEFAULT_EPOCH);
        let mut previous = gen.generate();
        for _ in 0..10_000 {
            let next = gen.generate();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_unique_across_threads() {
        let gen = Arc::new(SnowflakeGenerator::new(7, DEFAULT_EPOCH));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || (0..2_000).map(|_| gen.generate()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 8_000);
    }

    #[test]
    fn test_timestamp_of() {
        let gen = SnowflakeGenerator::new(1, DEFAULT_EPOCH);
        let id = gen.generate();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let ts = gen.timestamp_of(id);
        assert!(ts <= now + 1);
        assert!(ts > now - 1000);
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse("175928847299117063"), Some(175928847299117063));
        assert_eq!(parse("abc"), None);
        assert_eq!(parse("-4"), None);
        assert_eq!(parse("0"), None);
    }
}
