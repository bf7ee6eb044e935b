use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::core::error::Error;

const MACHINE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;

pub const MAX_MACHINE_ID: u16 = (1 << MACHINE_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

/// 2020-01-01T00:00:00Z in unix milliseconds.
const EPOCH_MS: i64 = 1_577_836_800_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnowflakeParts {
    pub timestamp: DateTime<Utc>,
    pub machine_id: u16,
    pub sequence: u16,
}

#[derive(Debug, Default)]
struct State {
    last_ms: i64,
    sequence: u64,
}

/// Time ordered 64-bit ids: 42 bits of milliseconds since 2020, 10 bits of
/// machine id, 12 bits of sequence.
#[derive(Debug)]
pub struct Snowflake {
    machine_id: u16,
    state: Mutex<State>,
}

impl Snowflake {
    pub fn new(machine_id: u16) -> Result<Self, Error> {
        if machine_id > MAX_MACHINE_ID {
            return Err(Error::InvalidMachineId(machine_id));
        }

        Ok(Self {
            machine_id,
            state: Mutex::new(State::default()),
        })
    }

    pub fn next(&self) -> u64 {
        // the guarded state stays consistent even if a holder panicked
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // a clock going backwards keeps counting on the last seen millisecond
        let mut now = elapsed_ms().max(state.last_ms);

        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                while now <= state.last_ms {
                    std::hint::spin_loop();
                    now = elapsed_ms();
                }
            }
        } else {
            state.sequence = 0;
        }

        state.last_ms = now;

        ((now as u64) << (MACHINE_BITS + SEQUENCE_BITS))
            | (u64::from(self.machine_id) << SEQUENCE_BITS)
            | state.sequence
    }

    pub fn parse(id: u64) -> SnowflakeParts {
        let millis = (id >> (MACHINE_BITS + SEQUENCE_BITS)) as i64 + EPOCH_MS;

        SnowflakeParts {
            timestamp: Utc
                .timestamp_millis_opt(millis)
                .single()
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            machine_id: ((id >> SEQUENCE_BITS) & u64::from(MAX_MACHINE_ID)) as u16,
            sequence: (id & MAX_SEQUENCE) as u16,
        }
    }
}

fn elapsed_ms() -> i64 {
    (Utc::now().timestamp_millis() - EPOCH_MS).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_are_distinct_and_increasing() {
        let snowflake = Snowflake::new(7).unwrap();
        let ids: Vec<u64> = (0..10_000).map(|_| snowflake.next()).collect();

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_parse() {
        let before = Utc::now();
        let id = Snowflake::new(513).unwrap().next();
        let parts = Snowflake::parse(id);

        assert_eq!(parts.machine_id, 513);
        assert_eq!(parts.sequence, 0);
        assert!((parts.timestamp - before).num_seconds().abs() < 5);
    }

    #[test]
    fn test_rejects_large_machine_id() {
        assert!(matches!(
            Snowflake::new(1024),
            Err(Error::InvalidMachineId(1024))
        ));
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let snowflake = Arc::new(Snowflake::new(1).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let snowflake = snowflake.clone();
                std::thread::spawn(move || (0..2_000).map(|_| snowflake.next()).collect::<Vec<_>>())
            })
            .collect();

        let ids: HashSet<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 8_000);
    }
}
