use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RuleTableError;
use crate::models::regime::check_rate;

/// One band of the progressive schedule: income above `lower_bound` (and
/// below the next band's bound) is taxed at `rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    pub lower_bound: Decimal,
    pub rate: Decimal,
}

impl Bracket {
    pub fn new(
        lower_bound: Decimal,
        rate: Decimal,
    ) -> Self {
        Self { lower_bound, rate }
    }
}

/// The income tax schedule of one tax year, ordered by ascending bound.
/// The last bracket is open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketTable {
    tax_year: i32,
    brackets: Vec<Bracket>,
}

impl BracketTable {
    /// Builds a schedule after checking that it is non-empty, that bounds
    /// are non-negative and strictly increasing and that every rate is a
    /// fraction.
    pub fn new(
        tax_year: i32,
        brackets: Vec<Bracket>,
    ) -> Result<Self, RuleTableError> {
        let first = brackets.first().ok_or(RuleTableError::NoBrackets)?;
        if first.lower_bound < Decimal::ZERO {
            return Err(RuleTableError::NegativeAmount {
                what: "first bracket lower bound".to_string(),
                amount: first.lower_bound,
            });
        }
        for pair in brackets.windows(2) {
            if pair[1].lower_bound <= pair[0].lower_bound {
                return Err(RuleTableError::UnorderedBrackets {
                    previous: pair[0].lower_bound,
                    next: pair[1].lower_bound,
                });
            }
        }
        for bracket in &brackets {
            check_rate(
                &format!("rate of bracket starting at {}", bracket.lower_bound),
                bracket.rate,
            )?;
        }

        Ok(Self { tax_year, brackets })
    }

    pub fn tax_year(&self) -> i32 {
        self.tax_year
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    /// Upper limit of the bracket at `index`, `None` for the last one.
    pub fn upper_bound(
        &self,
        index: usize,
    ) -> Option<Decimal> {
        self.brackets.get(index + 1).map(|b| b.lower_bound)
    }

    /// Rate applied to the last euro of `part_income`.
    pub fn marginal_rate(
        &self,
        part_income: Decimal,
    ) -> Decimal {
        self.brackets
            .iter()
            .take_while(|b| b.lower_bound < part_income)
            .last()
            .map_or(Decimal::ZERO, |b| b.rate)
    }
}
