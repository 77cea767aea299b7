use super::connection::Connection;
use super::cycle::{CycleStatus, PaymentCycle};
use super::ids::{ConnectionId, CycleId, Pair, SessionId, StudentId, TeacherId};
use super::session::Session;
use super::teacher::TeacherAccount;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Everything one billing operation writes, applied all-or-nothing by
/// [`LedgerStore::commit`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WriteSet {
    pub connections: Vec<Connection>,
    pub sessions: Vec<Session>,
    pub cycles: Vec<PaymentCycle>,
    pub teachers: Vec<TeacherAccount>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn session(mut self, session: Session) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn cycle(mut self, cycle: PaymentCycle) -> Self {
        self.cycles.push(cycle);
        self
    }

    pub fn teacher(mut self, account: TeacherAccount) -> Self {
        self.teachers.push(account);
        self
    }
}

/// Storage for the billing ledger.
///
/// Reads are independent; writes only happen through `commit`, which must
/// apply the whole write set or nothing. Stores also maintain the
/// pair -> active cycle lookup used by [`LedgerStore::active_cycle`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn next_session_id(&self) -> Result<SessionId>;
    async fn next_cycle_id(&self) -> Result<CycleId>;

    async fn connection(&self, id: ConnectionId) -> Result<Option<Connection>>;
    async fn cycle(&self, id: CycleId) -> Result<Option<PaymentCycle>>;
    async fn active_cycle(&self, pair: Pair) -> Result<Option<PaymentCycle>>;
    async fn teacher_account(&self, teacher: TeacherId) -> Result<Option<TeacherAccount>>;

    /// All cycles in creation order.
    async fn cycles(&self) -> Result<Vec<PaymentCycle>>;
    async fn cycles_for_teacher(&self, teacher: TeacherId) -> Result<Vec<PaymentCycle>>;
    async fn cycles_for_student(&self, student: StudentId) -> Result<Vec<PaymentCycle>>;
    async fn cycles_with_status(&self, status: CycleStatus) -> Result<Vec<PaymentCycle>>;
    async fn sessions_for_student(&self, student: StudentId) -> Result<Vec<Session>>;
    async fn sessions_for_cycle(&self, cycle: CycleId) -> Result<Vec<Session>>;

    async fn commit(&self, writes: WriteSet) -> Result<()>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type LedgerStoreFactory = Box<dyn Fn() -> LedgerStoreBox + Send + Sync>;

/// Source of "now" and "today" for cycle dates and verification stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub type ClockBox = Box<dyn Clock>;
