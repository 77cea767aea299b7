//! Adapters for the domain ports: ledger stores, clocks and logging setup.

pub mod clock;
pub mod in_memory;
pub mod logging;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::connection::Connection;
use crate::domain::cycle::{CycleStatus, PaymentCycle};
use crate::domain::ids::{ConnectionId, CycleId, Pair};
use crate::error::{BillingError, Result};
use std::collections::HashMap;

/// Works out how the pair -> active cycle index changes when `cycles` are written.
///
/// `current` reads the index as stored. A write that would leave two active
/// cycles for one pair is refused, so a store never persists that state even
/// if a caller skips the resolver.
pub(crate) fn active_index_updates<F>(
    cycles: &[PaymentCycle],
    mut current: F,
) -> Result<HashMap<Pair, Option<CycleId>>>
where
    F: FnMut(Pair) -> Result<Option<CycleId>>,
{
    let mut updates: HashMap<Pair, Option<CycleId>> = HashMap::new();

    for cycle in cycles {
        let pair = cycle.pair();
        let indexed = match updates.get(&pair) {
            Some(entry) => *entry,
            None => current(pair)?,
        };

        if cycle.status == CycleStatus::Active {
            if let Some(existing) = indexed
                && existing != cycle.id
            {
                return Err(BillingError::Storage(format!(
                    "{} already has active cycle {}, refusing to activate cycle {}",
                    pair, existing, cycle.id
                )));
            }
            updates.insert(pair, Some(cycle.id));
        } else if indexed == Some(cycle.id) {
            updates.insert(pair, None);
        }
    }

    Ok(updates)
}

/// Refuses connection writes that would rebind a stored id to another pair.
///
/// Requests for different pairs don't share a lock, so the id check has to
/// happen again where the write lands.
pub(crate) fn check_connection_ids<F>(connections: &[Connection], mut stored: F) -> Result<()>
where
    F: FnMut(ConnectionId) -> Result<Option<Connection>>,
{
    for connection in connections {
        if let Some(existing) = stored(connection.id)?
            && existing.pair() != connection.pair()
        {
            return Err(BillingError::InvalidInput(format!(
                "Connection {} already exists",
                connection.id
            )));
        }
    }
    Ok(())
}
