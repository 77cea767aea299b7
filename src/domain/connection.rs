use super::ids::{ConnectionId, Pair, StudentId, TeacherId};
use crate::error::{BillingError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// A tutor request sent by a student to a teacher.
///
/// Sessions can only be logged against a connection the teacher has accepted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub student: StudentId,
    pub teacher: TeacherId,
    pub subject: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn request(
        id: ConnectionId,
        student: StudentId,
        teacher: TeacherId,
        subject: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(BillingError::InvalidInput(
                "Connection subject must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            student,
            teacher,
            subject: subject.to_string(),
            status: ConnectionStatus::Pending,
            created_at,
        })
    }

    pub fn pair(&self) -> Pair {
        Pair::new(self.student, self.teacher)
    }

    /// True when this connection lets `teacher` bill `student`.
    pub fn links(&self, student: StudentId, teacher: TeacherId) -> bool {
        self.status == ConnectionStatus::Accepted
            && self.student == student
            && self.teacher == teacher
    }

    pub fn accept(&mut self, teacher: TeacherId) -> Result<()> {
        self.answer(teacher, ConnectionStatus::Accepted)
    }

    pub fn reject(&mut self, teacher: TeacherId) -> Result<()> {
        self.answer(teacher, ConnectionStatus::Rejected)
    }

    fn answer(&mut self, teacher: TeacherId, status: ConnectionStatus) -> Result<()> {
        if self.teacher != teacher {
            return Err(BillingError::Forbidden(format!(
                "Connection {} was not addressed to teacher {}",
                self.id, teacher
            )));
        }
        if self.status != ConnectionStatus::Pending {
            return Err(BillingError::invalid_state(
                format!("Connection {}", self.id),
                ConnectionStatus::Pending,
                self.status,
            ));
        }
        self.status = status;
        Ok(())
    }
}
