//! Merges a period's declared expenses with bank-statement commission
//! charges into one consolidated list, and carries payment snapshots across
//! expense-set replacement.

use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::commission;
use crate::model::{BankTransaction, Expense, ExpenseInput, PaymentStatus};

/// Bank reference used when a commission total comes from the statement.
pub const STATEMENT_REFERENCE: &str = "ESTADO DE CUENTA";

/// Bank reference used when the USD equivalent was derived from a declared
/// bolívar amount rather than recorded by an administrator.
pub const AUTO_REFERENCE: &str = "CALCULO AUTOMATICO";

const VIRTUAL_COMMISSION_LABEL: &str = "COMISIONES BANCARIAS (ESTADO DE CUENTA)";

/// A zero or missing rate would otherwise divide by zero; 1 is substituted
/// uniformly so USD equivalents degrade to the raw bolívar figure.
pub fn effective_rate(rate: Option<Decimal>) -> Decimal {
    match rate {
        Some(r) if r > Decimal::ZERO => r,
        _ => Decimal::ONE,
    }
}

/// Consolidates declared expenses with the bank statement.
///
/// Debits matching the commission keyword set are totaled; the total lands
/// on the first matching declared expense, or on an appended virtual line
/// when none exists. Declared order is preserved, the virtual line goes
/// last, and no duplicate commission line is ever produced.
pub fn reconcile(
    period_id: Uuid,
    declared: Vec<Expense>,
    bank_transactions: &[BankTransaction],
    rate_at_period_start: Decimal,
) -> Vec<Expense> {
    let rate = effective_rate(Some(rate_at_period_start));

    let total_commission_bs: Decimal = bank_transactions
        .iter()
        .filter(|t| t.amount < Decimal::ZERO && commission::matches(&t.description))
        .map(|t| t.amount.abs())
        .sum();

    let mut merged = declared;

    if total_commission_bs > Decimal::ZERO {
        debug!(%total_commission_bs, "statement commissions found");
        let usd = total_commission_bs / rate;

        match merged
            .iter_mut()
            .find(|e| commission::matches(&e.description))
        {
            Some(entry) => {
                // Overlay payment fields only; id, description and declared
                // amount stay as the administrator entered them.
                entry.amount_bs = Some(total_commission_bs);
                entry.amount_usd_at_payment = Some(usd);
                entry.bcv_rate_at_payment = Some(rate);
                entry.bank_reference = Some(STATEMENT_REFERENCE.to_string());
                entry.payment_status = PaymentStatus::Pagado;
            }
            None => {
                merged.push(Expense {
                    id: Uuid::new_v4(),
                    period_id,
                    description: VIRTUAL_COMMISSION_LABEL.to_string(),
                    amount: usd,
                    payment_status: PaymentStatus::Pagado,
                    bank_reference: Some(STATEMENT_REFERENCE.to_string()),
                    payment_date: None,
                    amount_bs: Some(total_commission_bs),
                    bcv_rate_at_payment: Some(rate),
                    amount_usd_at_payment: Some(usd),
                    is_virtual: true,
                });
            }
        }
    } else {
        for entry in merged.iter_mut() {
            if !commission::matches(&entry.description) {
                continue;
            }
            let usd_missing = entry
                .amount_usd_at_payment
                .map_or(true, |v| v == Decimal::ZERO);
            let declared_bs = entry.amount_bs.filter(|bs| *bs > Decimal::ZERO);
            if let (true, Some(bs)) = (usd_missing, declared_bs) {
                entry.amount_usd_at_payment = Some(bs / rate);
                if entry.bank_reference.as_deref().map_or(true, str::is_empty) {
                    entry.bank_reference = Some(AUTO_REFERENCE.to_string());
                }
            }
        }
    }

    merged
}

/// Rebuilds a period's expense set from caller input, recovering payment
/// snapshots from the previously persisted set. Used identically by `save`
/// and `publish` so the preserve-payments invariant cannot diverge between
/// the two paths.
pub fn merge_payment_fields(
    period_id: Uuid,
    incoming: Vec<ExpenseInput>,
    existing: &[Expense],
) -> Vec<Expense> {
    incoming
        .into_iter()
        .map(|input| {
            let matched = input
                .id
                .and_then(|id| existing.iter().find(|e| e.id == id))
                .or_else(|| existing.iter().find(|e| e.description == input.description));

            let mut expense = Expense {
                id: input
                    .id
                    .or(matched.map(|e| e.id))
                    .unwrap_or_else(Uuid::new_v4),
                period_id,
                description: input.description.clone(),
                amount: input.amount,
                payment_status: input.payment_status.unwrap_or(PaymentStatus::Pendiente),
                bank_reference: input.bank_reference.clone(),
                payment_date: input.payment_date,
                amount_bs: input.amount_bs,
                bcv_rate_at_payment: input.bcv_rate_at_payment,
                amount_usd_at_payment: input.amount_usd_at_payment,
                is_virtual: false,
            };

            if !input.has_payment_snapshot() {
                if let Some(prior) = matched.filter(|e| e.has_payment_snapshot()) {
                    expense.payment_date = prior.payment_date;
                    expense.amount_bs = prior.amount_bs;
                    expense.bcv_rate_at_payment = prior.bcv_rate_at_payment;
                    expense.amount_usd_at_payment = prior.amount_usd_at_payment;
                    expense.bank_reference = prior.bank_reference.clone();
                    expense.payment_status = prior.payment_status;
                }
            }

            expense
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn txn(description: &str, amount: Decimal) -> BankTransaction {
        BankTransaction {
            date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            description: description.to_string(),
            amount,
        }
    }

    #[test]
    fn test_virtual_line_when_no_declared_commission() {
        let period_id = Uuid::new_v4();
        let declared = vec![
            Expense::new(period_id, "VIGILANCIA", dec!(100)),
            Expense::new(period_id, "ASEO URBANO", dec!(50)),
        ];
        let txns = vec![
            txn("COMISION TRANSFERENCIA", dec!(-30)),
            txn("COMISIÓN USO DE CANAL", dec!(-15)),
            txn("DEPOSITO CONDOMINIO 3-A", dec!(500)),
        ];

        let merged = reconcile(period_id, declared, &txns, dec!(40));

        assert_eq!(merged.len(), 3);
        let virtual_line = &merged[2];
        assert!(virtual_line.is_virtual);
        assert_eq!(virtual_line.amount, dec!(1.125));
        assert_eq!(virtual_line.amount_bs, Some(dec!(45)));
        assert_eq!(virtual_line.amount_usd_at_payment, Some(dec!(1.125)));
        assert_eq!(virtual_line.payment_status, PaymentStatus::Pagado);
        assert_eq!(
            virtual_line.bank_reference.as_deref(),
            Some(STATEMENT_REFERENCE)
        );
    }

    #[test]
    fn test_overlay_on_existing_commission_line() {
        let period_id = Uuid::new_v4();
        let mut commission_line = Expense::new(period_id, "COMISIONES BANCARIAS", dec!(2));
        commission_line.amount_bs = Some(dec!(10));
        let original_id = commission_line.id;
        let declared = vec![
            Expense::new(period_id, "VIGILANCIA", dec!(100)),
            commission_line,
        ];
        let txns = vec![txn("COMISION MANTENIMIENTO DE CUENTA", dec!(-80))];

        let merged = reconcile(period_id, declared, &txns, dec!(40));

        // Overlaid in place, never appended: one commission line only.
        assert_eq!(merged.len(), 2);
        let overlaid = &merged[1];
        assert_eq!(overlaid.id, original_id);
        assert_eq!(overlaid.description, "COMISIONES BANCARIAS");
        assert_eq!(overlaid.amount, dec!(2));
        assert_eq!(overlaid.amount_bs, Some(dec!(80)));
        assert_eq!(overlaid.amount_usd_at_payment, Some(dec!(2)));
        assert_eq!(overlaid.payment_status, PaymentStatus::Pagado);
        assert!(!overlaid.is_virtual);

        let commission_count = merged
            .iter()
            .filter(|e| commission::matches(&e.description))
            .count();
        assert_eq!(commission_count, 1);
    }

    #[test]
    fn test_auto_derive_usd_when_statement_has_no_commissions() {
        let period_id = Uuid::new_v4();
        let mut declared_commission = Expense::new(period_id, "COMISION BANCO", dec!(3));
        declared_commission.amount_bs = Some(dec!(120));
        let declared = vec![declared_commission];

        let merged = reconcile(period_id, declared, &[], dec!(40));

        let entry = &merged[0];
        assert_eq!(entry.amount_usd_at_payment, Some(dec!(3)));
        assert_eq!(entry.bank_reference.as_deref(), Some(AUTO_REFERENCE));
        // Status stays untouched on the auto-derive path.
        assert_eq!(entry.payment_status, PaymentStatus::Pendiente);
    }

    #[test]
    fn test_auto_derive_skips_entries_with_recorded_usd() {
        let period_id = Uuid::new_v4();
        let mut declared_commission = Expense::new(period_id, "COMISION BANCO", dec!(3));
        declared_commission.amount_bs = Some(dec!(120));
        declared_commission.amount_usd_at_payment = Some(dec!(2.95));
        declared_commission.bank_reference = Some("REF-123".to_string());

        let merged = reconcile(period_id, vec![declared_commission], &[], dec!(40));

        assert_eq!(merged[0].amount_usd_at_payment, Some(dec!(2.95)));
        assert_eq!(merged[0].bank_reference.as_deref(), Some("REF-123"));
    }

    #[test]
    fn test_zero_rate_substitutes_one() {
        let period_id = Uuid::new_v4();
        let txns = vec![txn("COMISION", dec!(-45))];

        let merged = reconcile(period_id, Vec::new(), &txns, dec!(0));

        assert_eq!(merged[0].amount_usd_at_payment, Some(dec!(45)));
        assert_eq!(merged[0].bcv_rate_at_payment, Some(dec!(1)));
    }

    #[test]
    fn test_positive_bank_amounts_never_count_as_commission() {
        let period_id = Uuid::new_v4();
        // A reversal credit mentioning "comision" is not a charge.
        let txns = vec![txn("REVERSO COMISION", dec!(30))];

        let merged = reconcile(period_id, Vec::new(), &txns, dec!(40));
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_preserves_snapshot_by_id() {
        let period_id = Uuid::new_v4();
        let mut paid = Expense::new(period_id, "VIGILANCIA", dec!(100));
        paid.payment_date = NaiveDate::from_ymd_opt(2026, 2, 10);
        paid.amount_bs = Some(dec!(4000));
        paid.bcv_rate_at_payment = Some(dec!(40));
        paid.amount_usd_at_payment = Some(dec!(100));
        paid.bank_reference = Some("REF-900".to_string());
        paid.payment_status = PaymentStatus::Pagado;

        // Incoming edit changes the amount but carries no payment fields.
        let incoming = vec![ExpenseInput {
            id: Some(paid.id),
            description: "VIGILANCIA".to_string(),
            amount: dec!(110),
            payment_status: None,
            bank_reference: None,
            payment_date: None,
            amount_bs: None,
            bcv_rate_at_payment: None,
            amount_usd_at_payment: None,
        }];

        let merged = merge_payment_fields(period_id, incoming, &[paid.clone()]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, paid.id);
        assert_eq!(merged[0].amount, dec!(110));
        assert_eq!(merged[0].payment_status, PaymentStatus::Pagado);
        assert_eq!(merged[0].payment_date, paid.payment_date);
        assert_eq!(merged[0].bank_reference.as_deref(), Some("REF-900"));
    }

    #[test]
    fn test_merge_matches_by_description_when_no_id() {
        let period_id = Uuid::new_v4();
        let mut paid = Expense::new(period_id, "HIDROCAPITAL", dec!(20));
        paid.payment_date = NaiveDate::from_ymd_opt(2026, 2, 12);
        paid.amount_bs = Some(dec!(800));
        paid.bcv_rate_at_payment = Some(dec!(40));
        paid.amount_usd_at_payment = Some(dec!(20));
        paid.payment_status = PaymentStatus::Pagado;

        let incoming = vec![ExpenseInput {
            id: None,
            description: "HIDROCAPITAL".to_string(),
            amount: dec!(20),
            payment_status: None,
            bank_reference: None,
            payment_date: None,
            amount_bs: None,
            bcv_rate_at_payment: None,
            amount_usd_at_payment: None,
        }];

        let merged = merge_payment_fields(period_id, incoming, &[paid.clone()]);
        assert_eq!(merged[0].id, paid.id);
        assert!(merged[0].has_payment_snapshot());
    }

    #[test]
    fn test_merge_defaults_new_rows_to_pendiente() {
        let period_id = Uuid::new_v4();
        let incoming = vec![ExpenseInput {
            id: None,
            description: "JARDINERIA".to_string(),
            amount: dec!(35),
            payment_status: None,
            bank_reference: None,
            payment_date: None,
            amount_bs: None,
            bcv_rate_at_payment: None,
            amount_usd_at_payment: None,
        }];

        let merged = merge_payment_fields(period_id, incoming, &[]);
        assert_eq!(merged[0].payment_status, PaymentStatus::Pendiente);
        assert!(!merged[0].has_payment_snapshot());
    }
}
