use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            pub fn value(&self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(StudentId(u32));
id_type!(TeacherId(u32));
id_type!(
    /// An accepted (or pending) tutor request between a student and a teacher.
    ConnectionId(u32)
);
id_type!(SessionId(u64));
id_type!(
    /// Allocated in creation order, so sorting by id sorts cycles by age.
    CycleId(u64)
);

/// The (student, teacher) pair a billing relationship is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub student: StudentId,
    pub teacher: TeacherId,
}

impl Pair {
    pub fn new(student: StudentId, teacher: TeacherId) -> Self {
        Self { student, teacher }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "student {} / teacher {}", self.student, self.teacher)
    }
}
