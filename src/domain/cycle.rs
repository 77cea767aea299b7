use super::ids::{CycleId, Pair, StudentId, TeacherId};
use super::money::{BillingPolicy, Money};
use crate::error::{BillingError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Accruing sessions.
    Active,
    /// Closed for accrual, waiting for the student to pay.
    PendingPayment,
    /// Proof of payment uploaded, waiting for an admin decision.
    PendingVerification,
    /// Verified. Terminal for this cycle.
    Paid,
}

/// Inputs that move a cycle between states.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CycleEvent {
    ThresholdReached,
    ProofAttached,
    Approved,
    Rejected,
}

impl CycleStatus {
    /// The state reached by applying `event`, or `None` if the transition is illegal.
    pub fn on(self, event: CycleEvent) -> Option<CycleStatus> {
        use CycleEvent::*;
        use CycleStatus::*;

        match (self, event) {
            (Active, ThresholdReached) => Some(PendingPayment),
            (PendingPayment, ProofAttached) => Some(PendingVerification),
            (PendingVerification, Approved) => Some(Paid),
            (PendingVerification, Rejected) => Some(PendingPayment),
            (Active, ProofAttached | Approved | Rejected)
            | (PendingPayment, ThresholdReached | Approved | Rejected)
            | (PendingVerification, ThresholdReached | ProofAttached)
            | (Paid, _) => None,
        }
    }

    pub fn is_awaiting_payment(self) -> bool {
        matches!(
            self,
            CycleStatus::PendingPayment | CycleStatus::PendingVerification
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CycleStatus::Active => "active",
            CycleStatus::PendingPayment => "pending_payment",
            CycleStatus::PendingVerification => "pending_verification",
            CycleStatus::Paid => "paid",
        }
    }
}

impl CycleEvent {
    fn required_status(self) -> CycleStatus {
        match self {
            CycleEvent::ThresholdReached => CycleStatus::Active,
            CycleEvent::ProofAttached => CycleStatus::PendingPayment,
            CycleEvent::Approved | CycleEvent::Rejected => CycleStatus::PendingVerification,
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference to an uploaded proof of payment (e.g. a stored image path).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(transparent)]
pub struct ProofRef(String);

impl ProofRef {
    pub fn new(reference: impl Into<String>) -> Result<Self> {
        let reference = reference.into();
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(BillingError::InvalidInput(
                "Proof of payment reference must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProofRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One billing period between a student and a teacher.
///
/// Totals only move through [`PaymentCycle::add_session`], which keeps
/// `commission` and `teacher_payable` derived from `total_amount`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentCycle {
    pub id: CycleId,
    pub student: StudentId,
    pub teacher: TeacherId,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub total_classes: u32,
    pub total_amount: Money,
    pub commission: Money,
    pub teacher_payable: Money,
    pub status: CycleStatus,
    pub payment_proof: Option<ProofRef>,
    pub payment_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentCycle {
    pub fn open(id: CycleId, pair: Pair, now: DateTime<Utc>) -> Self {
        Self {
            id,
            student: pair.student,
            teacher: pair.teacher,
            start_date: now.date_naive(),
            end_date: None,
            total_classes: 0,
            total_amount: Money::ZERO,
            commission: Money::ZERO,
            teacher_payable: Money::ZERO,
            status: CycleStatus::Active,
            payment_proof: None,
            payment_verified_at: None,
            created_at: now,
        }
    }

    pub fn pair(&self) -> Pair {
        Pair::new(self.student, self.teacher)
    }

    /// Attaches a session's amount and closes the cycle once the class
    /// threshold is reached. The threshold is checked after the increment.
    ///
    /// Returns true if this session closed the cycle.
    pub fn add_session(
        &mut self,
        amount: Money,
        policy: &BillingPolicy,
        today: NaiveDate,
    ) -> Result<bool> {
        if self.status != CycleStatus::Active {
            return Err(BillingError::invalid_state(
                format!("Cycle {}", self.id),
                CycleStatus::Active,
                self.status,
            ));
        }

        let total_classes = self.total_classes.checked_add(1).ok_or_else(|| {
            BillingError::InvalidInput(format!("Cycle {} class count overflows", self.id))
        })?;
        let total_amount = self.total_amount.checked_add(amount).ok_or_else(|| {
            BillingError::InvalidInput(format!("Cycle {} total overflows", self.id))
        })?;
        let commission = policy.commission_rate.commission_on(total_amount)?;

        self.total_classes = total_classes;
        self.total_amount = total_amount;
        self.commission = commission;
        self.teacher_payable = total_amount - commission;

        Ok(self.close_if_threshold(policy, today))
    }

    /// Moves an active cycle that reached the threshold to `pending_payment`.
    /// Calling it again, or on any other state, does nothing.
    pub fn close_if_threshold(&mut self, policy: &BillingPolicy, today: NaiveDate) -> bool {
        if self.status == CycleStatus::Active
            && self.total_classes >= policy.class_threshold
            && self.fire(CycleEvent::ThresholdReached).is_ok()
        {
            self.end_date = Some(today);
            true
        } else {
            false
        }
    }

    pub fn attach_proof(&mut self, proof: ProofRef) -> Result<()> {
        self.fire(CycleEvent::ProofAttached)?;
        self.payment_proof = Some(proof);
        Ok(())
    }

    /// Marks the cycle paid and returns the amount owed to the teacher.
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<Money> {
        self.fire(CycleEvent::Approved)?;
        self.payment_verified_at = Some(now);
        Ok(self.teacher_payable)
    }

    /// Sends the cycle back to the student for a new proof of payment.
    pub fn reject(&mut self) -> Result<()> {
        self.fire(CycleEvent::Rejected)?;
        self.payment_proof = None;
        Ok(())
    }

    fn fire(&mut self, event: CycleEvent) -> Result<()> {
        match self.status.on(event) {
            Some(next) => {
                self.status = next;
                Ok(())
            }
            None => Err(BillingError::invalid_state(
                format!("Cycle {}", self.id),
                event.required_status(),
                self.status,
            )),
        }
    }
}
