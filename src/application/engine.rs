use super::command::Command;
use super::locks::KeyedLocks;
use super::resolver::CycleResolver;
use crate::domain::connection::Connection;
use crate::domain::cycle::{PaymentCycle, ProofRef};
use crate::domain::ids::{ConnectionId, CycleId, Pair, StudentId, TeacherId};
use crate::domain::money::{BillingPolicy, Money};
use crate::domain::ports::{ClockBox, LedgerStoreBox, WriteSet};
use crate::domain::session::{Session, SessionLog};
use crate::domain::teacher::TeacherAccount;
use crate::error::{BillingError, Result};
use crate::infrastructure::clock::SystemClock;
use tracing::info;

/// Result of an admin decision on a cycle awaiting verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub cycle: PaymentCycle,
    /// The active cycle the pair accrues into next. Only set on approval.
    pub successor: Option<PaymentCycle>,
}

/// The main entry point for billing operations.
///
/// `BillingEngine` owns the ledger store and serializes every operation that
/// touches a (student, teacher) pair. Each operation gathers its writes into
/// one [`WriteSet`] and commits it at the end, so a failure anywhere leaves
/// storage as it was.
pub struct BillingEngine {
    pub(crate) store: LedgerStoreBox,
    clock: ClockBox,
    policy: BillingPolicy,
    pair_locks: KeyedLocks<Pair>,
    teacher_locks: KeyedLocks<TeacherId>,
}

impl BillingEngine {
    /// Creates an engine on the system clock with the default billing policy.
    pub fn new(store: LedgerStoreBox) -> Self {
        Self {
            store,
            clock: Box::new(SystemClock),
            policy: BillingPolicy::default(),
            pair_locks: KeyedLocks::new(),
            teacher_locks: KeyedLocks::new(),
        }
    }

    pub fn with_policy(mut self, policy: BillingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: ClockBox) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    fn resolver(&self) -> CycleResolver<'_> {
        CycleResolver::new(self.store.as_ref(), self.clock.as_ref())
    }

    /// Dispatches a command to the matching operation.
    pub async fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::RequestConnection {
                connection,
                student,
                teacher,
                subject,
            } => {
                self.request_connection(connection, student, teacher, &subject)
                    .await?;
            }
            Command::AcceptConnection {
                connection,
                teacher,
            } => {
                self.accept_connection(connection, teacher).await?;
            }
            Command::DeclineConnection {
                connection,
                teacher,
            } => {
                self.reject_connection(connection, teacher).await?;
            }
            Command::LogSession(log) => {
                self.log_session(log).await?;
            }
            Command::AttachProof {
                cycle,
                student,
                proof,
            } => {
                self.attach_proof(cycle, student, &proof).await?;
            }
            Command::Verify { cycle, approve } => {
                self.verify(cycle, approve).await?;
            }
            Command::OpenTeacherAccount { teacher, opening } => {
                self.open_teacher_account(teacher, opening).await?;
            }
        }
        Ok(())
    }

    /// Records a tutor request from a student to a teacher.
    pub async fn request_connection(
        &self,
        id: ConnectionId,
        student: StudentId,
        teacher: TeacherId,
        subject: &str,
    ) -> Result<Connection> {
        let _guard = self.pair_locks.lock(&Pair::new(student, teacher)).await;

        if self.store.connection(id).await?.is_some() {
            return Err(BillingError::InvalidInput(format!(
                "Connection {} already exists",
                id
            )));
        }

        let connection = Connection::request(id, student, teacher, subject, self.clock.now())?;
        self.store
            .commit(WriteSet::new().connection(connection.clone()))
            .await?;

        info!(connection = %id, student = %student, teacher = %teacher, "Tutor request recorded");
        Ok(connection)
    }

    pub async fn accept_connection(&self, id: ConnectionId, teacher: TeacherId) -> Result<Connection> {
        self.answer_connection(id, teacher, true).await
    }

    pub async fn reject_connection(&self, id: ConnectionId, teacher: TeacherId) -> Result<Connection> {
        self.answer_connection(id, teacher, false).await
    }

    async fn answer_connection(
        &self,
        id: ConnectionId,
        teacher: TeacherId,
        accept: bool,
    ) -> Result<Connection> {
        let found = self.find_connection(id).await?;
        let _guard = self.pair_locks.lock(&found.pair()).await;

        let mut connection = self.find_connection(id).await?;
        if accept {
            connection.accept(teacher)?;
        } else {
            connection.reject(teacher)?;
        }
        self.store
            .commit(WriteSet::new().connection(connection.clone()))
            .await?;

        info!(connection = %id, status = %connection.status, "Tutor request answered");
        Ok(connection)
    }

    async fn find_connection(&self, id: ConnectionId) -> Result<Connection> {
        self.store
            .connection(id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("Connection {}", id)))
    }

    /// Seeds a teacher's lifetime earnings, e.g. with history from before
    /// cycle billing.
    pub async fn open_teacher_account(
        &self,
        teacher: TeacherId,
        opening: Money,
    ) -> Result<TeacherAccount> {
        let _guard = self.teacher_locks.lock(&teacher).await;

        if self.store.teacher_account(teacher).await?.is_some() {
            return Err(BillingError::invalid_state(
                format!("Teacher account {}", teacher),
                "absent",
                "open",
            ));
        }

        let account = TeacherAccount::with_opening_balance(teacher, opening);
        self.store
            .commit(WriteSet::new().teacher(account.clone()))
            .await?;
        Ok(account)
    }

    /// The teacher's account, or an empty one if nothing was paid out yet.
    pub async fn teacher_account(&self, teacher: TeacherId) -> Result<TeacherAccount> {
        Ok(self
            .store
            .teacher_account(teacher)
            .await?
            .unwrap_or_else(|| TeacherAccount::new(teacher)))
    }

    /// Logs a completed class and bills it to the pair's active cycle.
    ///
    /// Opens a cycle if the pair has none, and closes it once the class
    /// threshold is reached. A session after that opens the next cycle.
    pub async fn log_session(&self, log: SessionLog) -> Result<Session> {
        log.validate()?;

        let pair = log.pair();
        let _guard = self.pair_locks.lock(&pair).await;

        let linked = self
            .store
            .connection(log.connection)
            .await?
            .is_some_and(|connection| connection.links(log.student, log.teacher));
        if !linked {
            return Err(BillingError::NotLinked {
                student: log.student.value(),
                teacher: log.teacher.value(),
            });
        }

        let mut cycle = self.resolver().resolve(pair).await?.cycle;
        let id = self.store.next_session_id().await?;
        let session = Session::record(id, cycle.id, log, self.clock.now())?;
        let closed = cycle.add_session(session.amount, &self.policy, self.clock.today())?;

        self.store
            .commit(WriteSet::new().session(session.clone()).cycle(cycle.clone()))
            .await?;

        info!(
            session = %session.id,
            cycle = %cycle.id,
            %pair,
            amount = %session.amount,
            total_classes = cycle.total_classes,
            "Session logged"
        );
        if closed {
            info!(
                cycle = %cycle.id,
                %pair,
                total_amount = %cycle.total_amount,
                "Cycle closed, awaiting payment"
            );
        }

        Ok(session)
    }

    /// The pair's active cycle, opening and saving one if there is none.
    pub async fn get_or_open_active_cycle(
        &self,
        student: StudentId,
        teacher: TeacherId,
    ) -> Result<PaymentCycle> {
        let pair = Pair::new(student, teacher);
        let _guard = self.pair_locks.lock(&pair).await;

        let resolved = self.resolver().resolve(pair).await?;
        if resolved.opened {
            self.store
                .commit(WriteSet::new().cycle(resolved.cycle.clone()))
                .await?;
        }
        Ok(resolved.cycle)
    }

    /// Records a student's proof of payment on a cycle awaiting payment.
    pub async fn attach_proof(
        &self,
        cycle_id: CycleId,
        student: StudentId,
        proof: &str,
    ) -> Result<PaymentCycle> {
        let proof = ProofRef::new(proof)?;
        let found = self.cycle(cycle_id).await?;
        let _guard = self.pair_locks.lock(&found.pair()).await;

        let mut cycle = self.cycle(cycle_id).await?;
        if cycle.student != student {
            return Err(BillingError::Forbidden(format!(
                "Cycle {} does not belong to student {}",
                cycle_id, student
            )));
        }
        cycle.attach_proof(proof)?;
        self.store
            .commit(WriteSet::new().cycle(cycle.clone()))
            .await?;

        info!(cycle = %cycle.id, student = %student, "Proof of payment attached");
        Ok(cycle)
    }

    /// Applies an admin's decision on a cycle awaiting verification.
    ///
    /// Approval pays the teacher and hands back the pair's next active cycle.
    /// Rejection clears the proof so the student can upload again.
    pub async fn verify(&self, cycle_id: CycleId, approve: bool) -> Result<Verification> {
        let found = self.cycle(cycle_id).await?;
        let pair = found.pair();
        let _guard = self.pair_locks.lock(&pair).await;

        let mut cycle = self.cycle(cycle_id).await?;

        if !approve {
            cycle.reject()?;
            self.store
                .commit(WriteSet::new().cycle(cycle.clone()))
                .await?;
            info!(cycle = %cycle.id, %pair, "Payment rejected");
            return Ok(Verification {
                cycle,
                successor: None,
            });
        }

        let payable = cycle.approve(self.clock.now())?;

        let _teacher_guard = self.teacher_locks.lock(&cycle.teacher).await;
        let mut account = self.teacher_account(cycle.teacher).await?;
        account.credit(payable)?;

        let successor = self.resolver().resolve(pair).await?;
        let mut writes = WriteSet::new().cycle(cycle.clone()).teacher(account.clone());
        if successor.opened {
            writes = writes.cycle(successor.cycle.clone());
        }
        self.store.commit(writes).await?;

        info!(
            cycle = %cycle.id,
            %pair,
            teacher_payable = %payable,
            lifetime_earnings = %account.lifetime_earnings,
            successor = %successor.cycle.id,
            "Payment verified"
        );

        Ok(Verification {
            cycle,
            successor: Some(successor.cycle),
        })
    }

    pub async fn cycle(&self, id: CycleId) -> Result<PaymentCycle> {
        self.store
            .cycle(id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("Cycle {}", id)))
    }

    /// All cycles in creation order.
    pub async fn cycles(&self) -> Result<Vec<PaymentCycle>> {
        self.store.cycles().await
    }

    pub async fn sessions_for_cycle(&self, id: CycleId) -> Result<Vec<Session>> {
        self.cycle(id).await?;
        self.store.sessions_for_cycle(id).await
    }
}
