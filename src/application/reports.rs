//! Read-only views over the ledger for the teacher, student and admin screens.

use super::engine::BillingEngine;
use crate::domain::cycle::{CycleStatus, PaymentCycle};
use crate::domain::ids::{StudentId, TeacherId};
use crate::domain::money::Money;
use crate::domain::session::Session;
use crate::error::Result;
use std::cmp::Reverse;

/// How many verified payments the admin overview lists.
pub const RECENT_PAYMENTS_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct TeacherEarnings {
    pub teacher: TeacherId,
    /// Newest first.
    pub cycles: Vec<PaymentCycle>,
    /// Payable on cycles that are paid.
    pub total_earned: Money,
    /// Payable on cycles closed but not yet paid.
    pub pending_amount: Money,
    pub lifetime_earnings: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentBilling {
    pub student: StudentId,
    /// Most recent class first.
    pub sessions: Vec<Session>,
    pub active_cycles: Vec<PaymentCycle>,
    pub pending_payments: Vec<PaymentCycle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentsOverview {
    pub awaiting_verification: Vec<PaymentCycle>,
    pub recently_paid: Vec<PaymentCycle>,
    pub total_commission: Money,
}

impl BillingEngine {
    pub async fn teacher_earnings(&self, teacher: TeacherId) -> Result<TeacherEarnings> {
        let mut cycles = self.store.cycles_for_teacher(teacher).await?;
        cycles.sort_by_key(|c| Reverse(c.id));

        let total_earned = cycles
            .iter()
            .filter(|c| c.status == CycleStatus::Paid)
            .map(|c| c.teacher_payable)
            .sum();
        let pending_amount = cycles
            .iter()
            .filter(|c| c.status.is_awaiting_payment())
            .map(|c| c.teacher_payable)
            .sum();
        let lifetime_earnings = self.teacher_account(teacher).await?.lifetime_earnings;

        Ok(TeacherEarnings {
            teacher,
            cycles,
            total_earned,
            pending_amount,
            lifetime_earnings,
        })
    }

    pub async fn student_billing(&self, student: StudentId) -> Result<StudentBilling> {
        let mut sessions = self.store.sessions_for_student(student).await?;
        sessions.sort_by_key(|s| Reverse((s.date, s.id)));

        let (active_cycles, rest): (Vec<_>, Vec<_>) = self
            .store
            .cycles_for_student(student)
            .await?
            .into_iter()
            .partition(|c| c.status == CycleStatus::Active);
        let pending_payments = rest
            .into_iter()
            .filter(|c| c.status.is_awaiting_payment())
            .collect();

        Ok(StudentBilling {
            student,
            sessions,
            active_cycles,
            pending_payments,
        })
    }

    pub async fn payments_overview(&self) -> Result<PaymentsOverview> {
        let awaiting_verification = self
            .store
            .cycles_with_status(CycleStatus::PendingVerification)
            .await?;

        let mut paid = self.store.cycles_with_status(CycleStatus::Paid).await?;
        let total_commission = paid.iter().map(|c| c.commission).sum();
        paid.sort_by_key(|c| Reverse((c.payment_verified_at, c.id)));
        paid.truncate(RECENT_PAYMENTS_LIMIT);

        Ok(PaymentsOverview {
            awaiting_verification,
            recently_paid: paid,
            total_commission,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{ConnectionId, CycleId};
    use crate::domain::session::SessionLog;
    use crate::infrastructure::in_memory::InMemoryLedgerStore;
    use rust_decimal_macros::dec;

    const TEACHER: TeacherId = TeacherId(10);

    async fn engine_with_students(students: &[u32]) -> BillingEngine {
        let engine = BillingEngine::new(Box::new(InMemoryLedgerStore::new()));
        for &student in students {
            let connection = ConnectionId(student);
            engine
                .request_connection(connection, StudentId(student), TEACHER, "english")
                .await
                .unwrap();
            engine.accept_connection(connection, TEACHER).await.unwrap();
        }
        engine
    }

    async fn log(engine: &BillingEngine, student: u32, date: &str, count: usize) -> CycleId {
        let mut cycle = None;
        for _ in 0..count {
            let session = engine
                .log_session(SessionLog {
                    student: StudentId(student),
                    teacher: TEACHER,
                    connection: ConnectionId(student),
                    date: date.to_string(),
                    duration_hours: dec!(1),
                    hourly_rate: Money::new(400),
                    notes: None,
                })
                .await
                .unwrap();
            cycle = Some(session.cycle);
        }
        cycle.unwrap()
    }

    #[tokio::test]
    async fn test_teacher_earnings_split_by_status() {
        let engine = engine_with_students(&[1, 2, 3]).await;

        let paid = log(&engine, 1, "2026-01-10", 25).await;
        engine.attach_proof(paid, StudentId(1), "p1.png").await.unwrap();
        engine.verify(paid, true).await.unwrap();

        let pending = log(&engine, 2, "2026-01-11", 25).await;
        engine.attach_proof(pending, StudentId(2), "p2.png").await.unwrap();

        log(&engine, 3, "2026-01-12", 2).await;

        let earnings = engine.teacher_earnings(TEACHER).await.unwrap();
        assert_eq!(earnings.total_earned, Money::new(9000));
        assert_eq!(earnings.pending_amount, Money::new(9000));
        assert_eq!(earnings.lifetime_earnings, Money::new(9000));

        let ids: Vec<_> = earnings.cycles.iter().map(|c| c.id.value()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(ids, sorted);
        // paid, successor, pending, active for student 3
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn test_student_billing_lists_sessions_and_cycles() {
        let engine = engine_with_students(&[1]).await;
        log(&engine, 1, "2026-01-01", 24).await;
        log(&engine, 1, "2026-02-01", 2).await;

        let billing = engine.student_billing(StudentId(1)).await.unwrap();
        assert_eq!(billing.sessions.len(), 26);
        assert_eq!(billing.sessions[0].date.to_string(), "2026-02-01");
        assert_eq!(billing.active_cycles.len(), 1);
        assert_eq!(billing.active_cycles[0].total_classes, 1);
        assert_eq!(billing.pending_payments.len(), 1);
        assert_eq!(billing.pending_payments[0].status, CycleStatus::PendingPayment);
    }

    #[tokio::test]
    async fn test_payments_overview() {
        let engine = engine_with_students(&[1, 2]).await;

        let first = log(&engine, 1, "2026-01-10", 25).await;
        engine.attach_proof(first, StudentId(1), "p1.png").await.unwrap();
        engine.verify(first, true).await.unwrap();

        let second = log(&engine, 2, "2026-01-10", 25).await;
        engine.attach_proof(second, StudentId(2), "p2.png").await.unwrap();

        let overview = engine.payments_overview().await.unwrap();
        assert_eq!(overview.recently_paid.len(), 1);
        assert_eq!(overview.recently_paid[0].id, first);
        assert_eq!(overview.awaiting_verification.len(), 1);
        assert_eq!(overview.awaiting_verification[0].id, second);
        assert_eq!(overview.total_commission, Money::new(1000));
    }
}
