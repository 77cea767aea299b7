use crate::domain::ids::{ConnectionId, CycleId, StudentId, TeacherId};
use crate::domain::money::Money;
use crate::domain::session::SessionLog;

/// A single request against the billing engine, carrying the acting
/// principal's ids explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RequestConnection {
        connection: ConnectionId,
        student: StudentId,
        teacher: TeacherId,
        subject: String,
    },
    AcceptConnection {
        connection: ConnectionId,
        teacher: TeacherId,
    },
    DeclineConnection {
        connection: ConnectionId,
        teacher: TeacherId,
    },
    LogSession(SessionLog),
    AttachProof {
        cycle: CycleId,
        student: StudentId,
        proof: String,
    },
    Verify {
        cycle: CycleId,
        approve: bool,
    },
    OpenTeacherAccount {
        teacher: TeacherId,
        opening: Money,
    },
}
