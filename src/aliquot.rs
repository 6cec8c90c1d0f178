//! Per-unit share computation for a period's consolidated expense set.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::EngineError;
use crate::model::Expense;

/// Half-up rounding to 2 decimal places, the financial-statement convention
/// used at every aggregation step.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliquotBreakdown {
    pub total_expenses: Decimal,
    pub reserve_fund: Decimal,
    pub final_total: Decimal,
    pub aliquot_per_unit: Decimal,
}

/// Splits a period's total (expenses plus reserve fund) equally across the
/// tower's units. The unit count is fixed per building configuration.
pub struct AliquotCalculator {
    unit_count: u32,
}

impl AliquotCalculator {
    pub fn new(unit_count: u32) -> Result<Self, EngineError> {
        if unit_count == 0 {
            return Err(EngineError::validation(
                "tower unit count must be a positive integer",
            ));
        }
        Ok(AliquotCalculator { unit_count })
    }

    pub fn unit_count(&self) -> u32 {
        self.unit_count
    }

    /// Rounding is applied at each step, not once at the end, so the
    /// displayed totals always add up.
    pub fn compute(&self, expenses: &[Expense], reserve_fund: Decimal) -> AliquotBreakdown {
        let total_expenses = round2(expenses.iter().map(|e| e.amount).sum());
        let reserve_fund = round2(reserve_fund);
        let final_total = round2(total_expenses + reserve_fund);
        let aliquot_per_unit = round2(final_total / Decimal::from(self.unit_count));

        AliquotBreakdown {
            total_expenses,
            reserve_fund,
            final_total,
            aliquot_per_unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Expense;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn expenses(amounts: &[Decimal]) -> Vec<Expense> {
        let period_id = Uuid::new_v4();
        amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| Expense::new(period_id, format!("GASTO {i}"), *amount))
            .collect()
    }

    #[test]
    fn test_zero_unit_count_is_a_config_error() {
        assert!(AliquotCalculator::new(0).is_err());
        assert!(AliquotCalculator::new(16).is_ok());
    }

    #[test]
    fn test_reference_scenario() {
        // 100 + 50 expenses, 16 reserve, 16 units.
        let calc = AliquotCalculator::new(16).unwrap();
        let breakdown = calc.compute(&expenses(&[dec!(100), dec!(50)]), dec!(16));

        assert_eq!(breakdown.total_expenses, dec!(150.00));
        assert_eq!(breakdown.final_total, dec!(166.00));
        assert_eq!(breakdown.aliquot_per_unit, dec!(10.38));
    }

    #[test]
    fn test_final_total_is_sum_of_rounded_parts() {
        let calc = AliquotCalculator::new(16).unwrap();
        let breakdown = calc.compute(&expenses(&[dec!(33.333), dec!(66.666)]), dec!(10.005));

        assert_eq!(
            breakdown.final_total,
            round2(breakdown.total_expenses + breakdown.reserve_fund)
        );
    }

    #[test]
    fn test_per_unit_rounding_error_is_bounded() {
        let calc = AliquotCalculator::new(16).unwrap();
        let breakdown = calc.compute(&expenses(&[dec!(100.07), dec!(49.91)]), dec!(16.02));

        let distributed = breakdown.aliquot_per_unit * dec!(16);
        let drift = (distributed - breakdown.final_total).abs();
        assert!(drift <= dec!(0.01) * dec!(16), "drift was {drift}");
    }

    #[test]
    fn test_half_up_rounding() {
        assert_eq!(round2(dec!(10.375)), dec!(10.38));
        assert_eq!(round2(dec!(10.374)), dec!(10.37));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn test_empty_expense_set() {
        let calc = AliquotCalculator::new(16).unwrap();
        let breakdown = calc.compute(&[], dec!(16));
        assert_eq!(breakdown.total_expenses, dec!(0.00));
        assert_eq!(breakdown.final_total, dec!(16.00));
        assert_eq!(breakdown.aliquot_per_unit, dec!(1.00));
    }
}
