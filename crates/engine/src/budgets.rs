//! Budget thresholds and spending snapshots.
//!
//! A [`BudgetThreshold`] is the read-only configuration of one category for an
//! accounting period; a [`SpendingSnapshot`] holds how much was spent so far.
//! Both are inputs of the [`BudgetAlertEngine`](crate::BudgetAlertEngine).

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine};

/// Warn ratio used when a budget does not configure one (80% of the limit).
pub const DEFAULT_WARN_RATIO: f64 = 0.8;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetThreshold {
    pub category_id: String,
    pub limit: MoneyCents,
    /// Fraction of `limit` at which a warning fires, in `(0, 1)`.
    pub warn_ratio: f64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl BudgetThreshold {
    pub fn new(
        category_id: impl Into<String>,
        limit: MoneyCents,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            limit,
            warn_ratio: DEFAULT_WARN_RATIO,
            period_start,
            period_end,
        }
    }

    #[must_use]
    pub fn warn_ratio(mut self, warn_ratio: f64) -> Self {
        self.warn_ratio = warn_ratio;
        self
    }

    /// Check the threshold is usable for evaluation.
    pub fn validate(&self) -> ResultEngine<()> {
        if self.category_id.trim().is_empty() {
            return Err(EngineError::InvalidThreshold(
                "category_id must not be empty".to_string(),
            ));
        }
        if !self.limit.is_positive() {
            return Err(EngineError::InvalidThreshold(format!(
                "limit for '{}' must be > 0, got {}",
                self.category_id, self.limit
            )));
        }
        if !(self.warn_ratio > 0.0 && self.warn_ratio < 1.0) {
            return Err(EngineError::InvalidThreshold(format!(
                "warn_ratio for '{}' must be in (0, 1), got {}",
                self.category_id, self.warn_ratio
            )));
        }
        if self.period_end < self.period_start {
            return Err(EngineError::InvalidThreshold(format!(
                "period for '{}' ends before it starts",
                self.category_id
            )));
        }
        Ok(())
    }
}

/// Spent amount per category in the current period. Missing categories count
/// as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingSnapshot {
    spent: HashMap<String, MoneyCents>,
}

impl SpendingSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, category_id: impl Into<String>, spent: MoneyCents) -> Self {
        self.insert(category_id, spent);
        self
    }

    pub fn insert(&mut self, category_id: impl Into<String>, spent: MoneyCents) {
        self.spent.insert(category_id.into(), spent);
    }

    #[must_use]
    pub fn spent(&self, category_id: &str) -> MoneyCents {
        self.spent.get(category_id).copied().unwrap_or_default()
    }

    /// Aggregate expenses that happened between `start` and `end` (inclusive).
    ///
    /// Expenses may be recorded with either sign, the absolute value is what
    /// counts against the budget.
    pub fn from_expenses<'a>(
        expenses: impl IntoIterator<Item = &'a Expense>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        let mut snapshot = Self::new();
        for expense in expenses
            .into_iter()
            .filter(|e| start <= e.occurred_on && e.occurred_on <= end)
        {
            *snapshot
                .spent
                .entry(expense.category_id.clone())
                .or_default() += expense.amount.abs();
        }
        snapshot
    }
}

impl<S: Into<String>> FromIterator<(S, MoneyCents)> for SpendingSnapshot {
    fn from_iter<T: IntoIterator<Item = (S, MoneyCents)>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for (category_id, spent) in iter {
            snapshot.insert(category_id, spent);
        }
        snapshot
    }
}

/// A single expense as recorded by the surrounding application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub category_id: String,
    pub amount: MoneyCents,
    pub occurred_on: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub category_id: String,
    pub limit_minor: i64,
    pub warn_ratio: f64,
    pub period_start: Date,
    pub period_end: Date,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_threshold(threshold: &BudgetThreshold, now: DateTime<Utc>) -> Self {
        Self {
            category_id: ActiveValue::Set(threshold.category_id.clone()),
            limit_minor: ActiveValue::Set(threshold.limit.cents()),
            warn_ratio: ActiveValue::Set(threshold.warn_ratio),
            period_start: ActiveValue::Set(threshold.period_start),
            period_end: ActiveValue::Set(threshold.period_end),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }
}

impl From<Model> for BudgetThreshold {
    fn from(model: Model) -> Self {
        Self {
            category_id: model.category_id,
            limit: MoneyCents::new(model.limit_minor),
            warn_ratio: model.warn_ratio,
            period_start: model.period_start,
            period_end: model.period_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn groceries() -> BudgetThreshold {
        BudgetThreshold::new("groceries", MoneyCents::new(100_00), day(1), day(31))
    }

    #[test]
    fn default_warn_ratio_is_eighty_percent() {
        assert_eq!(groceries().warn_ratio, 0.8);
        assert!(groceries().validate().is_ok());
    }

    #[test]
    fn validate_rejects_malformed_rows() {
        let zero = BudgetThreshold {
            limit: MoneyCents::ZERO,
            ..groceries()
        };
        assert!(matches!(
            zero.validate(),
            Err(EngineError::InvalidThreshold(_))
        ));

        for ratio in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(groceries().warn_ratio(ratio).validate().is_err(), "{ratio}");
        }

        let reversed = BudgetThreshold {
            period_start: day(31),
            period_end: day(1),
            ..groceries()
        };
        assert!(reversed.validate().is_err());
    }

    #[test]
    fn snapshot_from_expenses_sums_absolute_values_in_period() {
        let expenses = [
            Expense {
                category_id: "food".to_string(),
                amount: MoneyCents::new(-45_67),
                occurred_on: day(15),
            },
            Expense {
                category_id: "food".to_string(),
                amount: MoneyCents::new(10_00),
                occurred_on: day(20),
            },
            Expense {
                category_id: "food".to_string(),
                amount: MoneyCents::new(99_00),
                occurred_on: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            },
        ];

        let snapshot = SpendingSnapshot::from_expenses(&expenses, day(1), day(31));
        assert_eq!(snapshot.spent("food"), MoneyCents::new(55_67));
        assert_eq!(snapshot.spent("rent"), MoneyCents::ZERO);
    }
}
