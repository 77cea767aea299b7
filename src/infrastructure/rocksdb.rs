use super::{active_index_updates, check_connection_ids};
use crate::domain::connection::Connection;
use crate::domain::cycle::{CycleStatus, PaymentCycle};
use crate::domain::ids::{ConnectionId, CycleId, Pair, SessionId, StudentId, TeacherId};
use crate::domain::ports::{LedgerStore, WriteSet};
use crate::domain::session::Session;
use crate::domain::teacher::TeacherAccount;
use crate::error::{BillingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Column Family for tutor requests.
pub const CF_CONNECTIONS: &str = "connections";
/// Column Family for logged sessions.
pub const CF_SESSIONS: &str = "sessions";
/// Column Family for payment cycles.
pub const CF_CYCLES: &str = "cycles";
/// Column Family mapping a (student, teacher) pair to its active cycle id.
pub const CF_ACTIVE_CYCLES: &str = "active_cycles";
/// Column Family for teacher accounts.
pub const CF_TEACHERS: &str = "teachers";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_CONNECTIONS,
    CF_SESSIONS,
    CF_CYCLES,
    CF_ACTIVE_CYCLES,
    CF_TEACHERS,
];

/// A persistent ledger backed by RocksDB.
///
/// Each table lives in its own Column Family with big-endian integer keys, so
/// iteration follows id order. Commits are a single `WriteBatch`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    session_seq: Arc<AtomicU64>,
    cycle_seq: Arc<AtomicU64>,
    commit_lock: Arc<Mutex<()>>,
}

fn pair_key(pair: Pair) -> [u8; 8] {
    let mut key = [0u8; 8];
    key[..4].copy_from_slice(&pair.student.value().to_be_bytes());
    key[4..].copy_from_slice(&pair.teacher.value().to_be_bytes());
    key
}

fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| BillingError::Storage(format!("Malformed key of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

impl RocksDBStore {
    /// Opens or creates a ledger at the specified path.
    ///
    /// Missing Column Families are created, and the id sequences resume after
    /// the highest stored session and cycle ids.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let store = Self {
            db: Arc::new(db),
            session_seq: Arc::new(AtomicU64::new(0)),
            cycle_seq: Arc::new(AtomicU64::new(0)),
            commit_lock: Arc::new(Mutex::new(())),
        };
        store
            .session_seq
            .store(store.last_key(CF_SESSIONS)?, Ordering::SeqCst);
        store
            .cycle_seq
            .store(store.last_key(CF_CYCLES)?, Ordering::SeqCst);

        Ok(store)
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| BillingError::Storage(format!("{} column family not found", name)))
    }

    fn last_key(&self, name: &str) -> Result<u64> {
        let cf = self.cf(name)?;
        match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _value) = item?;
                decode_u64(&key)
            }
            None => Ok(0),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T, F>(&self, name: &str, keep: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let cf = self.cf(name)?;
        let mut items = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let decoded: T = serde_json::from_slice(&value)?;
            if keep(&decoded) {
                items.push(decoded);
            }
        }
        Ok(items)
    }

    fn put_json<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        name: &str,
        key: &[u8],
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(name)?;
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn indexed_active(&self, pair: Pair) -> Result<Option<CycleId>> {
        let cf = self.cf(CF_ACTIVE_CYCLES)?;
        match self.db.get_cf(cf, pair_key(pair))? {
            Some(bytes) => Ok(Some(CycleId(decode_u64(&bytes)?))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn next_session_id(&self) -> Result<SessionId> {
        Ok(SessionId(self.session_seq.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn next_cycle_id(&self) -> Result<CycleId> {
        Ok(CycleId(self.cycle_seq.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn connection(&self, id: ConnectionId) -> Result<Option<Connection>> {
        self.get_json(CF_CONNECTIONS, &id.value().to_be_bytes())
    }

    async fn cycle(&self, id: CycleId) -> Result<Option<PaymentCycle>> {
        self.get_json(CF_CYCLES, &id.value().to_be_bytes())
    }

    async fn active_cycle(&self, pair: Pair) -> Result<Option<PaymentCycle>> {
        match self.indexed_active(pair)? {
            Some(id) => self.get_json(CF_CYCLES, &id.value().to_be_bytes()),
            None => Ok(None),
        }
    }

    async fn teacher_account(&self, teacher: TeacherId) -> Result<Option<TeacherAccount>> {
        self.get_json(CF_TEACHERS, &teacher.value().to_be_bytes())
    }

    async fn cycles(&self) -> Result<Vec<PaymentCycle>> {
        self.scan_json(CF_CYCLES, |_: &PaymentCycle| true)
    }

    async fn cycles_for_teacher(&self, teacher: TeacherId) -> Result<Vec<PaymentCycle>> {
        self.scan_json(CF_CYCLES, |c: &PaymentCycle| c.teacher == teacher)
    }

    async fn cycles_for_student(&self, student: StudentId) -> Result<Vec<PaymentCycle>> {
        self.scan_json(CF_CYCLES, |c: &PaymentCycle| c.student == student)
    }

    async fn cycles_with_status(&self, status: CycleStatus) -> Result<Vec<PaymentCycle>> {
        self.scan_json(CF_CYCLES, |c: &PaymentCycle| c.status == status)
    }

    async fn sessions_for_student(&self, student: StudentId) -> Result<Vec<Session>> {
        self.scan_json(CF_SESSIONS, |s: &Session| s.student == student)
    }

    async fn sessions_for_cycle(&self, cycle: CycleId) -> Result<Vec<Session>> {
        self.scan_json(CF_SESSIONS, |s: &Session| s.cycle == cycle)
    }

    async fn commit(&self, writes: WriteSet) -> Result<()> {
        let _guard = self.commit_lock.lock().await;

        check_connection_ids(&writes.connections, |id| {
            self.get_json(CF_CONNECTIONS, &id.value().to_be_bytes())
        })?;
        let index = active_index_updates(&writes.cycles, |pair| self.indexed_active(pair))?;

        let mut batch = WriteBatch::default();
        for connection in &writes.connections {
            self.put_json(
                &mut batch,
                CF_CONNECTIONS,
                &connection.id.value().to_be_bytes(),
                connection,
            )?;
        }
        for session in &writes.sessions {
            self.put_json(&mut batch, CF_SESSIONS, &session.id.value().to_be_bytes(), session)?;
        }
        for cycle in &writes.cycles {
            self.put_json(&mut batch, CF_CYCLES, &cycle.id.value().to_be_bytes(), cycle)?;
        }
        for account in &writes.teachers {
            self.put_json(
                &mut batch,
                CF_TEACHERS,
                &account.teacher.value().to_be_bytes(),
                account,
            )?;
        }

        let active_cf = self.cf(CF_ACTIVE_CYCLES)?;
        for (pair, entry) in index {
            match entry {
                Some(id) => batch.put_cf(active_cf, pair_key(pair), id.value().to_be_bytes()),
                None => batch.delete_cf(active_cf, pair_key(pair)),
            }
        }

        self.db.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use chrono::Utc;
    use tempfile::tempdir;

    fn pair() -> Pair {
        Pair::new(StudentId(1), TeacherId(10))
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in COLUMN_FAMILIES {
            assert!(store.db.cf_handle(name).is_some());
        }
    }

    #[tokio::test]
    async fn test_rocksdb_cycle_roundtrip_and_index() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let id = store.next_cycle_id().await.unwrap();
        let cycle = PaymentCycle::open(id, pair(), Utc::now());
        store.commit(WriteSet::new().cycle(cycle.clone())).await.unwrap();

        assert_eq!(store.cycle(id).await.unwrap(), Some(cycle.clone()));
        assert_eq!(store.active_cycle(pair()).await.unwrap(), Some(cycle.clone()));

        let mut closed = cycle;
        closed.status = CycleStatus::PendingPayment;
        store.commit(WriteSet::new().cycle(closed)).await.unwrap();
        assert!(store.active_cycle(pair()).await.unwrap().is_none());
        assert_eq!(
            store.cycles_with_status(CycleStatus::PendingPayment).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_rocksdb_sequences_resume_after_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            for _ in 0..3 {
                let id = store.next_cycle_id().await.unwrap();
                let mut cycle = PaymentCycle::open(id, pair(), Utc::now());
                cycle.status = CycleStatus::Paid;
                store.commit(WriteSet::new().cycle(cycle)).await.unwrap();
            }
        }

        let reopened = RocksDBStore::open(dir.path()).unwrap();
        assert_eq!(reopened.next_cycle_id().await.unwrap(), CycleId(4));
        assert_eq!(reopened.next_session_id().await.unwrap(), SessionId(1));
        assert_eq!(reopened.cycles().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rocksdb_rejected_commit_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        store
            .commit(WriteSet::new().cycle(PaymentCycle::open(CycleId(1), pair(), Utc::now())))
            .await
            .unwrap();

        let account = TeacherAccount::with_opening_balance(TeacherId(10), Money::new(100));
        let result = store
            .commit(
                WriteSet::new()
                    .teacher(account)
                    .cycle(PaymentCycle::open(CycleId(2), pair(), Utc::now())),
            )
            .await;

        assert!(result.is_err());
        assert!(store.teacher_account(TeacherId(10)).await.unwrap().is_none());
        assert!(store.cycle(CycleId(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_connection_id_is_not_rebound() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
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
