use super::ids::TeacherId;
use super::money::Money;
use crate::error::{BillingError, Result};
use serde::{Deserialize, Serialize};

/// Running record of what a teacher has been paid through the platform.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TeacherAccount {
    pub teacher: TeacherId,
    pub lifetime_earnings: Money,
    /// Number of cycles paid out to this teacher.
    pub paid_cycles: u32,
}

impl TeacherAccount {
    pub fn new(teacher: TeacherId) -> Self {
        Self::with_opening_balance(teacher, Money::ZERO)
    }

    /// An account carrying earnings made before billing moved onto cycles.
    pub fn with_opening_balance(teacher: TeacherId, opening: Money) -> Self {
        Self {
            teacher,
            lifetime_earnings: opening,
            paid_cycles: 0,
        }
    }

    pub fn credit(&mut self, payable: Money) -> Result<()> {
        self.lifetime_earnings = self.lifetime_earnings.checked_add(payable).ok_or_else(|| {
            BillingError::InvalidInput(format!(
                "Lifetime earnings of teacher {} overflow",
                self.teacher
            ))
        })?;
        self.paid_cycles += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_adds_payable() {
        let mut account = TeacherAccount::with_opening_balance(TeacherId(10), Money::new(45000));
        account.credit(Money::new(11250)).unwrap();
        assert_eq!(account.lifetime_earnings, Money::new(56250));
        assert_eq!(account.paid_cycles, 1);
    }

    #[test]
    fn test_credit_overflow_leaves_account_untouched() {
        let mut account = TeacherAccount::with_opening_balance(TeacherId(10), Money::new(u64::MAX));
        assert!(account.credit(Money::new(1)).is_err());
        assert_eq!(account.lifetime_earnings, Money::new(u64::MAX));
        assert_eq!(account.paid_cycles, 0);
    }
}
