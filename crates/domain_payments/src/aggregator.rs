//! Plan progress summaries
//!
//! Pure computation over a set of installments, used for the plan header
//! and the client dashboard.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money};
use crate::error::PaymentError;
use crate::installment::{InstallmentStatus, PaymentInstallment};

/// Money and count totals for one plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_scheduled: Money,
    pub total_paid: Money,
    pub total_pending: Money,
    pub total_overdue: Money,
    pub installment_count: usize,
    pub paid_count: usize,
    pub pending_count: usize,
    pub overdue_count: usize,
}

impl PlanSummary {
    /// Amount still owed (pending plus overdue)
    pub fn outstanding(&self) -> Result<Money, PaymentError> {
        Ok(self.total_pending.checked_add(&self.total_overdue)?)
    }

    /// Fraction of the total already paid, in `0..=1`
    ///
    /// An empty plan has made no progress.
    pub fn paid_ratio(&self) -> Decimal {
        if self.total_scheduled.is_zero() {
            return Decimal::ZERO;
        }
        self.total_paid.amount() / self.total_scheduled.amount()
    }
}

/// Summarises installments in `currency`
///
/// Each installment lands in exactly one bucket according to its stored
/// status, so `paid + pending + overdue == total` always holds. Fails with a
/// validation error if an installment carries a different currency.
pub fn aggregate(
    installments: &[PaymentInstallment],
    currency: Currency,
) -> Result<PlanSummary, PaymentError> {
    let mut summary = PlanSummary {
        total_scheduled: Money::zero(currency),
        total_paid: Money::zero(currency),
        total_pending: Money::zero(currency),
        total_overdue: Money::zero(currency),
        installment_count: installments.len(),
        paid_count: 0,
        pending_count: 0,
        overdue_count: 0,
    };

    for installment in installments {
        summary.total_scheduled = summary.total_scheduled.checked_add(&installment.amount)?;
        match installment.status {
            InstallmentStatus::Paid => {
                summary.total_paid = summary.total_paid.checked_add(&installment.amount)?;
                summary.paid_count += 1;
            }
            InstallmentStatus::Pending => {
                summary.total_pending = summary.total_pending.checked_add(&installment.amount)?;
                summary.pending_count += 1;
            }
            InstallmentStatus::Overdue => {
                summary.total_overdue = summary.total_overdue.checked_add(&installment.amount)?;
                summary.overdue_count += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::PaymentPlanId;
    use rust_decimal_macros::dec;

    fn installment(amount: Decimal, status: InstallmentStatus) -> PaymentInstallment {
        let mut inst = PaymentInstallment::new(
            PaymentPlanId::new(),
            1,
            Money::new(amount, Currency::MXN),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Pago",
        );
        inst.status = status;
        inst
    }

    #[test]
    fn test_empty_plan_sums_to_zero() {
        let summary = aggregate(&[], Currency::MXN).unwrap();
        assert!(summary.total_scheduled.is_zero());
        assert_eq!(summary.installment_count, 0);
        assert_eq!(summary.paid_ratio(), Decimal::ZERO);
    }

    #[test]
    fn test_buckets_follow_status() {
        let items = vec![
            installment(dec!(30000), InstallmentStatus::Paid),
            installment(dec!(14000), InstallmentStatus::Overdue),
            installment(dec!(14000), InstallmentStatus::Pending),
            installment(dec!(14000), InstallmentStatus::Pending),
        ];

        let summary = aggregate(&items, Currency::MXN).unwrap();
        assert_eq!(summary.total_scheduled.amount(), dec!(72000));
        assert_eq!(summary.total_paid.amount(), dec!(30000));
        assert_eq!(summary.total_overdue.amount(), dec!(14000));
        assert_eq!(summary.total_pending.amount(), dec!(28000));
        assert_eq!(summary.paid_count, 1);
        assert_eq!(summary.pending_count, 2);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.outstanding().unwrap().amount(), dec!(42000));
    }

    #[test]
    fn test_mixed_currency_is_rejected() {
        let mut foreign = installment(dec!(10), InstallmentStatus::Pending);
        foreign.amount = Money::new(dec!(10), Currency::USD);

        let err = aggregate(&[foreign], Currency::MXN).unwrap_err();
        assert_eq!(err.field(), Some("amount"));
    }
}
