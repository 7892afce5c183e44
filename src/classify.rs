//! Category rules for recurring statement entries.
//!
//! Each bucket is a plain substring-membership test against the transaction
//! description, with the pattern lists kept as data so the rule set can be
//! extended (or localized) without touching the evaluation logic.

use std::ops::AddAssign;

use rust_decimal::Decimal;

/// Recognized payers and description fragments of recurring income
/// (salary, child benefit, named employers, credit interest accrued).
const REGULAR_INCOME_PATTERNS: &[&str] = &[
    "משכורת",
    "ביטוח לאומי - ילדים",
    "ח משרד ראש",
    "אדגו",
    "טלדור מערכ",
    "זקיפת רבית זכות",
];

/// Cheque deposits, counted separately from other incoming amounts.
const CHEQUE_DEPOSIT_PATTERNS: &[&str] = &["הפקדת שיק"];

/// Outflows excluded from the regular-outcome bucket: deposits to savings,
/// deposit renewals and securities purchases move money rather than spend it.
const EXCLUDED_OUTFLOW_PATTERNS: &[&str] = &["הפקדה ל", "חידוש פיק", "קניית ני"];

/// Per-transaction category deltas, also used as the running totals
/// accumulated over a whole statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryAmounts {
    pub regular_income: Decimal,
    pub cheque_in: Decimal,
    /// Carried negated: spending decreases the bucket.
    pub regular_outcome: Decimal,
}

impl AddAssign for CategoryAmounts {
    fn add_assign(&mut self, rhs: Self) {
        self.regular_income += rhs.regular_income;
        self.cheque_in += rhs.cheque_in;
        self.regular_outcome += rhs.regular_outcome;
    }
}

fn matches_any(description: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| description.contains(pattern))
}

/// Assigns one transaction's amounts to the category buckets.
///
/// The three buckets are independent tests against the same description;
/// all of them are evaluated for every transaction regardless of amount sign.
pub fn classify(description: &str, credit: Decimal, debit: Decimal) -> CategoryAmounts {
    CategoryAmounts {
        regular_income: if matches_any(description, REGULAR_INCOME_PATTERNS) {
            credit
        } else {
            Decimal::ZERO
        },
        cheque_in: if matches_any(description, CHEQUE_DEPOSIT_PATTERNS) {
            credit
        } else {
            Decimal::ZERO
        },
        regular_outcome: if matches_any(description, EXCLUDED_OUTFLOW_PATTERNS) {
            Decimal::ZERO
        } else {
            -debit
        },
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::{classify, CategoryAmounts};

    #[test]
    fn should_count_a_salary_as_regular_income() {
        assert_eq!(
            CategoryAmounts {
                regular_income: dec!(5000),
                cheque_in: Decimal::ZERO,
                regular_outcome: Decimal::ZERO,
            },
            classify("משכורת חודש מרץ", dec!(5000), Decimal::ZERO)
        );
    }

    #[test]
    fn should_count_a_cheque_deposit_separately() {
        assert_eq!(
            CategoryAmounts {
                regular_income: Decimal::ZERO,
                cheque_in: dec!(300),
                regular_outcome: Decimal::ZERO,
            },
            classify("הפקדת שיק", dec!(300), Decimal::ZERO)
        );
    }

    #[test]
    fn should_exclude_a_securities_purchase_from_regular_outcome() {
        assert_eq!(
            CategoryAmounts::default(),
            classify("קניית ני\"ע", Decimal::ZERO, dec!(1000))
        );
    }

    #[test]
    fn should_count_an_unrecognized_debit_as_negated_regular_outcome() {
        assert_eq!(
            CategoryAmounts {
                regular_income: Decimal::ZERO,
                cheque_in: Decimal::ZERO,
                regular_outcome: dec!(-72.50),
            },
            classify("סופרמרקט", Decimal::ZERO, dec!(72.50))
        );
    }

    #[test]
    fn should_evaluate_every_bucket_for_a_single_transaction() {
        // A salary line with a debit still feeds both income and outcome.
        assert_eq!(
            CategoryAmounts {
                regular_income: dec!(5000),
                cheque_in: Decimal::ZERO,
                regular_outcome: dec!(-20),
            },
            classify("משכורת", dec!(5000), dec!(20))
        );
    }

    #[test]
    fn should_accumulate_totals() {
        let mut totals = CategoryAmounts::default();
        totals += classify("משכורת", dec!(5000), Decimal::ZERO);
        totals += classify("הפקדת שיק", dec!(300), Decimal::ZERO);
        totals += classify("סופרמרקט", Decimal::ZERO, dec!(250));
        assert_eq!(
            CategoryAmounts {
                regular_income: dec!(5000),
                cheque_in: dec!(300),
                regular_outcome: dec!(-250),
            },
            totals
        );
    }
}
