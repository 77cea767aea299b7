use super::{active_index_updates, check_connection_ids};
use crate::domain::connection::Connection;
use crate::domain::cycle::{CycleStatus, PaymentCycle};
use crate::domain::ids::{ConnectionId, CycleId, Pair, SessionId, StudentId, TeacherId};
use crate::domain::ports::{LedgerStore, WriteSet};
use crate::domain::session::Session;
use crate::domain::teacher::TeacherAccount;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Ledger {
    connections: HashMap<ConnectionId, Connection>,
    sessions: BTreeMap<SessionId, Session>,
    cycles: BTreeMap<CycleId, PaymentCycle>,
    active: HashMap<Pair, CycleId>,
    teachers: HashMap<TeacherId, TeacherAccount>,
}

/// A thread-safe in-memory ledger.
///
/// All tables sit behind one `RwLock`, so a commit is applied under a single
/// write guard and readers never observe half of it. Clones share state.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    ledger: Arc<RwLock<Ledger>>,
    session_seq: Arc<AtomicU64>,
    cycle_seq: Arc<AtomicU64>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    async fn filter_cycles<F>(&self, keep: F) -> Vec<PaymentCycle>
    where
        F: Fn(&PaymentCycle) -> bool,
    {
        let ledger = self.ledger.read().await;
        ledger.cycles.values().filter(|c| keep(c)).cloned().collect()
    }

    async fn filter_sessions<F>(&self, keep: F) -> Vec<Session>
    where
        F: Fn(&Session) -> bool,
    {
        let ledger = self.ledger.read().await;
        ledger.sessions.values().filter(|s| keep(s)).cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn next_session_id(&self) -> Result<SessionId> {
        Ok(SessionId(self.session_seq.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn next_cycle_id(&self) -> Result<CycleId> {
        Ok(CycleId(self.cycle_seq.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn connection(&self, id: ConnectionId) -> Result<Option<Connection>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.connections.get(&id).cloned())
    }

    async fn cycle(&self, id: CycleId) -> Result<Option<PaymentCycle>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.cycles.get(&id).cloned())
    }

    async fn active_cycle(&self, pair: Pair) -> Result<Option<PaymentCycle>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .active
            .get(&pair)
            .and_then(|id| ledger.cycles.get(id))
            .cloned())
    }

    async fn teacher_account(&self, teacher: TeacherId) -> Result<Option<TeacherAccount>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.teachers.get(&teacher).cloned())
    }

    async fn cycles(&self) -> Result<Vec<PaymentCycle>> {
        Ok(self.filter_cycles(|_| true).await)
    }

    async fn cycles_for_teacher(&self, teacher: TeacherId) -> Result<Vec<PaymentCycle>> {
        Ok(self.filter_cycles(|c| c.teacher == teacher).await)
    }

    async fn cycles_for_student(&self, student: StudentId) -> Result<Vec<PaymentCycle>> {
        Ok(self.filter_cycles(|c| c.student == student).await)
    }

    async fn cycles_with_status(&self, status: CycleStatus) -> Result<Vec<PaymentCycle>> {
        Ok(self.filter_cycles(|c| c.status == status).await)
    }

    async fn sessions_for_student(&self, student: StudentId) -> Result<Vec<Session>> {
        Ok(self.filter_sessions(|s| s.student == student).await)
    }

    async fn sessions_for_cycle(&self, cycle: CycleId) -> Result<Vec<Session>> {
        Ok(self.filter_sessions(|s| s.cycle == cycle).await)
    }

    async fn commit(&self, writes: WriteSet) -> Result<()> {
        let mut ledger = self.ledger.write().await;

        check_connection_ids(&writes.connections, |id| {
            Ok(ledger.connections.get(&id).cloned())
        })?;
        let index = active_index_updates(&writes.cycles, |pair| {
            Ok(ledger.active.get(&pair).copied())
        })?;

        for (pair, entry) in index {
            match entry {
                Some(id) => ledger.active.insert(pair, id),
                None => ledger.active.remove(&pair),
            };
        }
        for connection in writes.connections {
            ledger.connections.insert(connection.id, connection);
        }
        for session in writes.sessions {
            ledger.sessions.insert(session.id, session);
        }
        for cycle in writes.cycles {
            ledger.cycles.insert(cycle.id, cycle);
        }
        for account in writes.teachers {
            ledger.teachers.insert(account.teacher, account);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::error::BillingError;
    use chrono::Utc;

    fn pair() -> Pair {
        Pair::new(StudentId(1), TeacherId(10))
    }

    #[tokio::test]
    async fn test_sequences_start_at_one() {
        let store = InMemoryLedgerStore::new();
        assert_eq!(store.next_cycle_id().await.unwrap(), CycleId(1));
        assert_eq!(store.next_cycle_id().await.unwrap(), CycleId(2));
        assert_eq!(store.next_session_id().await.unwrap(), SessionId(1));
    }

    #[tokio::test]
    async fn test_commit_indexes_active_cycle() {
        let store = InMemoryLedgerStore::new();
        let cycle = PaymentCycle::open(CycleId(1), pair(), Utc::now());

        store.commit(WriteSet::new().cycle(cycle.clone())).await.unwrap();
        assert_eq!(store.active_cycle(pair()).await.unwrap(), Some(cycle.clone()));

        let mut closed = cycle;
        closed.status = CycleStatus::PendingPayment;
        store.commit(WriteSet::new().cycle(closed.clone())).await.unwrap();
        assert_eq!(store.active_cycle(pair()).await.unwrap(), None);
        assert_eq!(store.cycle(CycleId(1)).await.unwrap(), Some(closed));
    }

    #[tokio::test]
    async fn test_rejected_commit_writes_nothing() {
        let store = InMemoryLedgerStore::new();
        let first = PaymentCycle::open(CycleId(1), pair(), Utc::now());
        store.commit(WriteSet::new().cycle(first)).await.unwrap();

        let second = PaymentCycle::open(CycleId(2), pair(), Utc::now());
        let account = TeacherAccount::with_opening_balance(TeacherId(10), Money::new(5));
        let result = store
            .commit(WriteSet::new().teacher(account).cycle(second))
            .await;

        assert!(result.is_err());
        assert!(store.cycle(CycleId(2)).await.unwrap().is_none());
        assert!(store.teacher_account(TeacherId(10)).await.unwrap().is_none());
        assert_eq!(
            store.active_cycle(pair()).await.unwrap().map(|c| c.id),
            Some(CycleId(1))
        );
    }

    #[tokio::test]
    async fn test_cycle_queries_keep_creation_order() {
        let store = InMemoryLedgerStore::new();
        let other = Pair::new(StudentId(2), TeacherId(10));
        let mut paid = PaymentCycle::open(CycleId(1), pair(), Utc::now());
        paid.status = CycleStatus::Paid;
        let active = PaymentCycle::open(CycleId(2), pair(), Utc::now());
        let elsewhere = PaymentCycle::open(CycleId(3), other, Utc::now());

        store
            .commit(WriteSet::new().cycle(elsewhere).cycle(active).cycle(paid))
            .await
            .unwrap();

        let ids: Vec<_> = store.cycles().await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![CycleId(1), CycleId(2), CycleId(3)]);

        let student: Vec<_> = store
            .cycles_for_student(StudentId(1))
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(student, vec![CycleId(1), CycleId(2)]);

        let paid: Vec<_> = store
            .cycles_with_status(CycleStatus::Paid)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(paid, vec![CycleId(1)]);
        assert_eq!(store.cycles_for_teacher(TeacherId(10)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_connection_id_is_not_rebound() {
        let store = InMemoryLedgerStore::new();
        let first = Connection::request(
            ConnectionId(1),
            StudentId(1),
            TeacherId(10),
            "maths",
            Utc::now(),
        )
        .unwrap();
        store.commit(WriteSet::new().connection(first.clone())).await.unwrap();

        let second = Connection::request(
            ConnectionId(1),
            StudentId(2),
            TeacherId(20),
            "physics",
            Utc::now(),
        )
        .unwrap();
        let result = store.commit(WriteSet::new().connection(second)).await;

        assert!(matches!(result, Err(BillingError::InvalidInput(_))));
        assert_eq!(store.connection(ConnectionId(1)).await.unwrap(), Some(first));
    }
}
