use crate::domain::cycle::PaymentCycle;
use crate::domain::ids::Pair;
use crate::domain::ports::{Clock, LedgerStore};
use crate::error::Result;
use tracing::debug;

/// The active cycle for a pair, and whether it was opened just now and still
/// has to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCycle {
    pub cycle: PaymentCycle,
    pub opened: bool,
}

/// Finds the active cycle for a pair or opens a new one.
///
/// This is the only place an `active` cycle is created. Callers hold the pair
/// lock and commit an opened cycle in the same write set as whatever they do
/// with it, so a pair never ends up with two active cycles.
pub struct CycleResolver<'a> {
    store: &'a dyn LedgerStore,
    clock: &'a dyn Clock,
}

impl<'a> CycleResolver<'a> {
    pub fn new(store: &'a dyn LedgerStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub async fn resolve(&self, pair: Pair) -> Result<ResolvedCycle> {
        if let Some(cycle) = self.store.active_cycle(pair).await? {
            return Ok(ResolvedCycle {
                cycle,
                opened: false,
            });
        }

        let id = self.store.next_cycle_id().await?;
        let cycle = PaymentCycle::open(id, pair, self.clock.now());
        debug!(cycle = %id, %pair, start_date = %cycle.start_date, "Opened payment cycle");

        Ok(ResolvedCycle {
            cycle,
            opened: true,
        })
    }
}
