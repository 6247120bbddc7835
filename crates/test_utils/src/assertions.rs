//! Custom Test Assertions
//!
//! Assertion helpers for money and schedules that give more meaningful
//! failure messages than plain `assert_eq!`.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_payments::{InstallmentDraft, InstallmentStatus, PaymentInstallment};

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a schedule adds up to `total` exactly, in its currency
pub fn assert_schedule_total(drafts: &[InstallmentDraft], total: &Money) {
    let mut sum = Decimal::ZERO;
    for draft in drafts {
        assert_eq!(
            draft.amount.currency(),
            total.currency(),
            "Installment #{} is in {}, expected {}",
            draft.installment_number,
            draft.amount.currency(),
            total.currency()
        );
        assert!(
            draft.amount.is_positive(),
            "Installment #{} has non-positive amount {}",
            draft.installment_number,
            draft.amount.amount()
        );
        sum += draft.amount.amount();
    }
    assert_eq!(
        sum,
        total.amount(),
        "Schedule sums to {} but the total is {}",
        sum,
        total.amount()
    );
}

/// Asserts that installment numbers are exactly `1..=n` in order
pub fn assert_contiguous(numbers: impl IntoIterator<Item = u32>) {
    let numbers: Vec<u32> = numbers.into_iter().collect();
    let expected: Vec<u32> = (1..=numbers.len() as u32).collect();
    assert_eq!(numbers, expected, "Installment numbers are not contiguous");
}

/// Asserts the status of installment `number` within a plan
pub fn assert_installment_status(installments: &[PaymentInstallment], number: u32, expected: InstallmentStatus) {
    let installment = installments
        .iter()
        .find(|i| i.installment_number == number)
        .unwrap_or_else(|| panic!("No installment #{}", number));
    assert_eq!(
        installment.status, expected,
        "Installment #{} is {}, expected {}",
        number, installment.status, expected
    );
}
