use chrono::{NaiveDate, Utc};
use sea_orm::{QueryFilter, QueryOrder, sea_query::OnConflict, prelude::*};

use crate::{
    AlertReport, BudgetThreshold, EngineError, ResultEngine, SpendingSnapshot, budgets,
};

use super::Engine;

impl Engine {
    /// Evaluate alerts and record them in the alert history.
    pub fn evaluate_budget_alerts(
        &self,
        thresholds: &[BudgetThreshold],
        spending: &SpendingSnapshot,
    ) -> AlertReport {
        self.alerts.evaluate(thresholds, spending)
    }

    /// Alerts currently in force, without touching the alert history.
    pub fn peek_budget_alerts(
        &self,
        thresholds: &[BudgetThreshold],
        spending: &SpendingSnapshot,
    ) -> AlertReport {
        self.alerts.check_alerts(thresholds, spending)
    }

    /// Reset the alert history, to be called on period rollover.
    pub fn clear_budget_alert_history(&self) {
        self.alerts.clear_history();
    }

    /// Evaluate the stored budgets whose period contains `on`.
    pub async fn evaluate_stored_budgets(
        &self,
        on: NaiveDate,
        spending: &SpendingSnapshot,
    ) -> ResultEngine<AlertReport> {
        let thresholds = self.budget_thresholds(on).await?;
        Ok(self.alerts.evaluate(&thresholds, spending))
    }

    /// Insert or replace the budget of a category.
    pub async fn upsert_budget(&self, threshold: &BudgetThreshold) -> ResultEngine<()> {
        threshold.validate()?;
        let model = budgets::ActiveModel::from_threshold(threshold, Utc::now());
        budgets::Entity::insert(model)
            .on_conflict(
                OnConflict::column(budgets::Column::CategoryId)
                    .update_columns([
                        budgets::Column::LimitMinor,
                        budgets::Column::WarnRatio,
                        budgets::Column::PeriodStart,
                        budgets::Column::PeriodEnd,
                        budgets::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.database)
            .await?;
        tracing::debug!(category = %threshold.category_id, "budget saved");
        Ok(())
    }

    /// Budgets whose period contains `on`, in creation order.
    ///
    /// Rows are returned as stored: malformed ones are reported by the
    /// evaluation, not here.
    pub async fn budget_thresholds(&self, on: NaiveDate) -> ResultEngine<Vec<BudgetThreshold>> {
        let models = budgets::Entity::find()
            .filter(budgets::Column::PeriodStart.lte(on))
            .filter(budgets::Column::PeriodEnd.gte(on))
            .order_by_asc(budgets::Column::CreatedAt)
            .order_by_asc(budgets::Column::CategoryId)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(BudgetThreshold::from).collect())
    }

    /// Every stored budget, in creation order.
    pub async fn all_budgets(&self) -> ResultEngine<Vec<BudgetThreshold>> {
        let models = budgets::Entity::find()
            .order_by_asc(budgets::Column::CreatedAt)
            .order_by_asc(budgets::Column::CategoryId)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(BudgetThreshold::from).collect())
    }

    pub async fn remove_budget(&self, category_id: &str) -> ResultEngine<()> {
        let res = budgets::Entity::delete_by_id(category_id.to_string())
            .exec(&self.database)
            .await?;
        if res.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(category_id.to_string()));
        }
        Ok(())
    }
}
