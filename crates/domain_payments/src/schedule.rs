//! Automatic schedule generation
//!
//! Splits a plan total into an advance payment plus equal monthly payments.
//! The output is an unsaved list of drafts; nothing is persisted until the
//! drafts are loaded into a `PlanDraft` and saved.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{add_months, Money, MoneyError};
use crate::draft::InstallmentDraft;
use crate::error::PaymentError;

/// Longest schedule the generator accepts, thirty years of monthly payments
pub const MAX_MONTHS: u32 = 360;

/// Generates an advance-plus-monthly schedule
///
/// # Arguments
///
/// * `total` - Amount to schedule, positive and at currency precision
/// * `months` - Number of installments including the advance
/// * `advance_percent` - Share of `total` due up front, `0..=100`
/// * `start_date` - Due date of the advance; payment `i` falls `i` months later
///
/// # Returns
///
/// Drafts numbered `1..=n` whose amounts add up to `total` exactly. Monthly
/// shares are truncated to the currency's minor unit and the last payment
/// takes the remainder. Zero-amount entries (a 0% or 100% advance) are left
/// out rather than scheduled.
pub fn generate(
    total: Money,
    months: u32,
    advance_percent: Decimal,
    start_date: NaiveDate,
) -> Result<Vec<InstallmentDraft>, PaymentError> {
    if !total.is_positive() {
        return Err(PaymentError::validation("total_amount", "must be greater than zero"));
    }
    if !total.has_currency_precision() {
        return Err(PaymentError::validation(
            "total_amount",
            format!("has more than {} decimal places", total.currency().decimal_places()),
        ));
    }
    if months == 0 {
        return Err(PaymentError::validation("months", "must be at least 1"));
    }
    if months > MAX_MONTHS {
        return Err(PaymentError::validation(
            "months",
            format!("must be at most {}", MAX_MONTHS),
        ));
    }
    if advance_percent < Decimal::ZERO || advance_percent > dec!(100) {
        return Err(PaymentError::validation(
            "advance_percent",
            "must be between 0 and 100",
        ));
    }

    if months == 1 {
        return Ok(vec![InstallmentDraft::new(1, total, start_date, "Anticipo (100%)")]);
    }

    let payments = months - 1;
    let (advance, remaining, shares) = advance_and_shares(total, advance_percent, payments)
        .map_err(|e| PaymentError::validation("total_amount", e.to_string()))?;

    if remaining.is_positive() && shares.first().is_some_and(|s| s.is_zero()) {
        return Err(PaymentError::validation(
            "months",
            format!("{} cannot be split into {} payments", remaining, payments),
        ));
    }

    let mut schedule = Vec::with_capacity(months as usize);
    if advance.is_positive() {
        schedule.push(InstallmentDraft::new(
            1,
            advance,
            start_date,
            format!("Anticipo ({}%)", advance_percent.normalize()),
        ));
    }

    for (index, share) in shares.into_iter().enumerate() {
        if share.is_zero() {
            continue;
        }
        let step = index as u32 + 1;
        let due_date = add_months(start_date, step)?;
        schedule.push(InstallmentDraft::new(
            schedule.len() as u32 + 1,
            share,
            due_date,
            format!("Pago {} de {}", step, payments),
        ));
    }

    Ok(schedule)
}

fn advance_and_shares(
    total: Money,
    advance_percent: Decimal,
    payments: u32,
) -> Result<(Money, Money, Vec<Money>), MoneyError> {
    let advance = total.percentage(advance_percent)?;
    let remaining = total.checked_sub(&advance)?;
    let shares = remaining.split_with_remainder(payments)?;
    Ok((advance, remaining, shares))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mxn(amount: Decimal) -> Money {
        Money::new(amount, Currency::MXN)
    }

    #[test]
    fn test_advance_plus_five_monthly_payments() {
        let schedule = generate(mxn(dec!(100000)), 6, dec!(30), date(2024, 1, 1)).unwrap();

        assert_eq!(schedule.len(), 6);
        assert_eq!(schedule[0].amount.amount(), dec!(30000));
        assert_eq!(schedule[0].due_date, date(2024, 1, 1));
        assert_eq!(schedule[0].description, "Anticipo (30%)");

        for (i, draft) in schedule[1..].iter().enumerate() {
            assert_eq!(draft.amount.amount(), dec!(14000));
            assert_eq!(draft.due_date, date(2024, 2 + i as u32, 1));
            assert_eq!(draft.description, format!("Pago {} de 5", i + 1));
        }

        let numbers: Vec<u32> = schedule.iter().map(|d| d.installment_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_single_month_is_whole_total() {
        let schedule = generate(mxn(dec!(2500.50)), 1, dec!(40), date(2024, 5, 20)).unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].amount.amount(), dec!(2500.50));
        assert_eq!(schedule[0].due_date, date(2024, 5, 20));
        assert_eq!(schedule[0].description, "Anticipo (100%)");
    }

    #[test]
    fn test_last_payment_absorbs_remainder() {
        let schedule = generate(mxn(dec!(1000)), 4, dec!(0), date(2024, 1, 1)).unwrap();
        let amounts: Vec<Decimal> = schedule.iter().map(|d| d.amount.amount()).collect();
        assert_eq!(amounts, vec![dec!(333.33), dec!(333.33), dec!(333.34)]);
    }

    #[test]
    fn test_zero_advance_is_omitted() {
        let schedule = generate(mxn(dec!(9000)), 4, dec!(0), date(2024, 1, 1)).unwrap();
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[0].installment_number, 1);
        assert_eq!(schedule[0].description, "Pago 1 de 3");
        assert_eq!(schedule[0].due_date, date(2024, 2, 1));
    }

    #[test]
    fn test_full_advance_leaves_only_the_advance() {
        let schedule = generate(mxn(dec!(9000)), 4, dec!(100), date(2024, 1, 1)).unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].amount.amount(), dec!(9000));
        assert_eq!(schedule[0].description, "Anticipo (100%)");
    }

    #[test]
    fn test_fractional_percent_label() {
        let schedule = generate(mxn(dec!(1000)), 3, dec!(12.50), date(2024, 1, 1)).unwrap();
        assert_eq!(schedule[0].description, "Anticipo (12.5%)");
        assert_eq!(schedule[0].amount.amount(), dec!(125));
    }

    #[test]
    fn test_month_end_start_clamps_due_dates() {
        let schedule = generate(mxn(dec!(3000)), 3, dec!(0), date(2024, 1, 31)).unwrap();
        assert_eq!(schedule[0].due_date, date(2024, 2, 29));
        assert_eq!(schedule[1].due_date, date(2024, 3, 31));
    }

    #[test]
    fn test_invalid_inputs_name_their_field() {
        let start = date(2024, 1, 1);
        let cases = [
            (generate(mxn(dec!(0)), 6, dec!(30), start), "total_amount"),
            (generate(mxn(dec!(-5)), 6, dec!(30), start), "total_amount"),
            (generate(mxn(dec!(10.001)), 6, dec!(30), start), "total_amount"),
            (generate(mxn(dec!(1000)), 0, dec!(30), start), "months"),
            (generate(mxn(dec!(1000)), 6, dec!(-1), start), "advance_percent"),
            (generate(mxn(dec!(1000)), 6, dec!(100.01), start), "advance_percent"),
            (generate(mxn(dec!(0.05)), 12, dec!(0), start), "months"),
            (generate(mxn(dec!(1000)), 361, dec!(30), start), "months"),
            (generate(mxn(dec!(1000)), u32::MAX, dec!(30), start), "months"),
            (generate(mxn(Decimal::MAX), 6, dec!(30), start), "total_amount"),
            (generate(mxn(Decimal::MAX), 6, dec!(100), start), "total_amount"),
        ];

        for (result, field) in cases {
            let err = result.unwrap_err();
            assert_eq!(err.field(), Some(field), "unexpected error {err}");
        }
    }

    proptest! {
        #[test]
        fn generated_schedule_sums_to_total(
            cents in 1_000i64..10_000_000_000i64,
            months in 1u32..48u32,
            percent in 0u32..=100u32,
        ) {
            let total = Money::from_minor(cents, Currency::MXN);
            match generate(total, months, Decimal::from(percent), date(2024, 1, 1)) {
                Ok(schedule) => {
                    let sum = Money::sum(schedule.iter().map(|d| &d.amount), Currency::MXN).unwrap();
                    prop_assert_eq!(sum, total);
                    prop_assert!(schedule.iter().all(|d| d.amount.is_positive()));
                    for (i, draft) in schedule.iter().enumerate() {
                        prop_assert_eq!(draft.installment_number, i as u32 + 1);
                    }
                }
                // only a remainder too small to spread over the months is refused
                Err(err) => prop_assert_eq!(err.field(), Some("months")),
            }
        }
    }
}
