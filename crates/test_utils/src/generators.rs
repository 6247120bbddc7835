//! Property-Based Test Generators
//!
//! Proptest strategies for schedule inputs and installment lists that
//! respect the domain's invariants (positive amounts, currency precision,
//! dense numbering).

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, Money, PaymentPlanId};
use domain_payments::{InstallmentStatus, PaymentInstallment};

/// Strategy for the supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![Just(Currency::MXN), Just(Currency::USD), Just(Currency::EUR)]
}

/// Strategy for positive amounts in minor units
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000i64
}

/// Strategy for positive Money values at currency precision
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

/// Strategy for advance percentages from 0% to 100% with two decimals
pub fn advance_percent_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..=10_000u32).prop_map(|n| Decimal::new(n as i64, 2))
}

/// Strategy for schedule lengths
pub fn months_strategy() -> impl Strategy<Value = u32> {
    1u32..=60u32
}

/// Strategy for start dates, including month ends
pub fn start_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2035i32, 1u32..=12u32, 1u32..=31u32).prop_map(|(y, m, d)| {
        (0..4)
            .find_map(|back| NaiveDate::from_ymd_opt(y, m, d - back))
            .unwrap_or_default()
    })
}

/// Inputs of `schedule::generate`
#[derive(Debug, Clone)]
pub struct ScheduleParams {
    pub total: Money,
    pub months: u32,
    pub advance_percent: Decimal,
    pub start_date: NaiveDate,
}

pub fn schedule_params_strategy() -> impl Strategy<Value = ScheduleParams> {
    (
        positive_money_strategy(),
        months_strategy(),
        advance_percent_strategy(),
        start_date_strategy(),
    )
        .prop_map(|(total, months, advance_percent, start_date)| ScheduleParams {
            total,
            months,
            advance_percent,
            start_date,
        })
}

pub fn installment_status_strategy() -> impl Strategy<Value = InstallmentStatus> {
    prop_oneof![
        Just(InstallmentStatus::Pending),
        Just(InstallmentStatus::Paid),
        Just(InstallmentStatus::Overdue),
    ]
}

/// Strategy for a plan's installments: numbered `1..=n`, MXN, mixed statuses
pub fn installments_strategy(max_len: usize) -> impl Strategy<Value = Vec<PaymentInstallment>> {
    prop::collection::vec(
        (1i64..100_000_000i64, installment_status_strategy(), 0i64..365i64),
        0..max_len,
    )
    .prop_map(|rows| {
        let plan_id = PaymentPlanId::new();
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        rows.into_iter()
            .enumerate()
            .map(|(i, (cents, status, offset))| {
                let due = base + Duration::days(offset);
                let mut installment = PaymentInstallment::new(
                    plan_id,
                    i as u32 + 1,
                    Money::from_minor(cents, Currency::MXN),
                    due,
                    format!("Pago {}", i + 1),
                );
                installment.status = status;
                if status == InstallmentStatus::Paid {
                    installment.paid_date = Some(due);
                }
                installment
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_payments::schedule;

    use crate::assertions::{assert_contiguous, assert_schedule_total};

    proptest! {
        #[test]
        fn generated_schedules_sum_to_total(params in schedule_params_strategy()) {
            let drafts = schedule::generate(
                params.total,
                params.months,
                params.advance_percent,
                params.start_date,
            );
            // very small totals can leave nothing for the monthly shares
            if let Ok(drafts) = drafts {
                assert_schedule_total(&drafts, &params.total);
                assert_contiguous(drafts.iter().map(|d| d.installment_number));
            }
        }

        #[test]
        fn installment_lists_are_numbered_densely(installments in installments_strategy(20)) {
            assert_contiguous(installments.iter().map(|i| i.installment_number));
        }
    }
}
