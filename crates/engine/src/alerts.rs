//! Budget alert evaluation.
//!
//! The [`BudgetAlertEngine`] compares a [`SpendingSnapshot`] against a set of
//! [`BudgetThreshold`]s and decides which alerts fire.
//!
//! Every category has a *surfaced severity* kept in an [`AlertHistory`]. An
//! alert is emitted only when its severity is strictly higher than the
//! surfaced one, so re-evaluating on every new expense does not repeat the
//! same notification. The history is monotonic inside a period: it only goes
//! back to empty through [`BudgetAlertEngine::clear_history`], which the caller
//! invokes on period rollover.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use engine::{BudgetAlertEngine, BudgetThreshold, MoneyCents, Severity, SpendingSnapshot};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
//! let thresholds = [BudgetThreshold::new("groceries", MoneyCents::new(100_00), start, end)];
//! let engine = BudgetAlertEngine::new();
//!
//! let spending = SpendingSnapshot::new().with("groceries", MoneyCents::new(85_00));
//! let report = engine.evaluate(&thresholds, &spending);
//! assert_eq!(report.alerts[0].severity, Severity::Warning);
//!
//! // Same severity again: suppressed.
//! let spending = SpendingSnapshot::new().with("groceries", MoneyCents::new(90_00));
//! assert!(engine.evaluate(&thresholds, &spending).alerts.is_empty());
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BudgetThreshold, EngineError, MoneyCents, SpendingSnapshot};

/// Alert urgency. `Warning < Exceeded`; "no alert" is `None`, which orders
/// below both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Exceeded,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Exceeded => "exceeded",
        }
    }

    /// Classify `spent` against a threshold.
    ///
    /// `spent >= limit` is [`Exceeded`](Self::Exceeded),
    /// `warn_ratio <= spent / limit < 1` is [`Warning`](Self::Warning).
    /// `limit` must be positive.
    #[must_use]
    pub fn classify(spent: MoneyCents, limit: MoneyCents, warn_ratio: f64) -> Option<Self> {
        if spent >= limit {
            Some(Self::Exceeded)
        } else if spent.ratio_of(limit) >= warn_ratio {
            Some(Self::Warning)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub category_id: String,
    pub severity: Severity,
    pub spent: MoneyCents,
    pub limit: MoneyCents,
    pub generated_at: DateTime<Utc>,
}

/// Outcome of an evaluation pass.
///
/// Malformed thresholds end up in `rejected` and never stop the others from
/// being evaluated.
#[derive(Debug, Default, PartialEq)]
pub struct AlertReport {
    pub alerts: Vec<AlertEvent>,
    pub rejected: Vec<EngineError>,
}

/// Highest severity surfaced per category since the last clear.
///
/// The history is owned by whoever builds the engine and can be shared between
/// engine instances through an `Arc`.
#[derive(Debug, Default)]
pub struct AlertHistory {
    surfaced: Mutex<HashMap<String, Severity>>,
}

impl AlertHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Severity>> {
        // The map is always left consistent, a panicking holder cannot corrupt it.
        self.surfaced.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn severity(&self, category_id: &str) -> Option<Severity> {
        self.lock().get(category_id).copied()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Record `severity` for `category_id` if it is strictly higher than the
/// surfaced one. Returns whether the history changed.
fn raise(surfaced: &mut HashMap<String, Severity>, category_id: &str, severity: Severity) -> bool {
    match surfaced.get_mut(category_id) {
        Some(current) if *current >= severity => false,
        Some(current) => {
            *current = severity;
            true
        }
        None => {
            surfaced.insert(category_id.to_string(), severity);
            true
        }
    }
}

/// Receives emitted alerts. Presentation (toast, banner, push) lives behind
/// this trait.
pub trait NotificationSink {
    fn notify(&self, event: &AlertEvent);
}

impl<F: Fn(&AlertEvent)> NotificationSink for F {
    fn notify(&self, event: &AlertEvent) {
        (self)(event)
    }
}

/// Sink that writes every alert to the `tracing` subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &AlertEvent) {
        match event.severity {
            Severity::Exceeded => tracing::warn!(
                category = %event.category_id,
                spent = %event.spent,
                limit = %event.limit,
                "budget exceeded"
            ),
            Severity::Warning => tracing::info!(
                category = %event.category_id,
                spent = %event.spent,
                limit = %event.limit,
                "budget warning"
            ),
        }
    }
}

/// Sink that keeps alerts in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<AlertEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AlertEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, event: &AlertEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Budget alert engine.
///
/// Cloning the engine shares its history.
#[derive(Clone, Debug, Default)]
pub struct BudgetAlertEngine {
    history: Arc<AlertHistory>,
}

impl BudgetAlertEngine {
    /// Engine with a fresh, empty history.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: Arc<AlertHistory>) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &Arc<AlertHistory> {
        &self.history
    }

    /// Evaluate every threshold and commit the emitted alerts to history.
    pub fn evaluate(
        &self,
        thresholds: &[BudgetThreshold],
        spending: &SpendingSnapshot,
    ) -> AlertReport {
        self.evaluate_at(thresholds, spending, Utc::now())
    }

    /// Like [`evaluate`](Self::evaluate) with an explicit `generated_at`.
    pub fn evaluate_at(
        &self,
        thresholds: &[BudgetThreshold],
        spending: &SpendingSnapshot,
        now: DateTime<Utc>,
    ) -> AlertReport {
        let (mut alerts, rejected) = classify_all(thresholds, spending, now);
        {
            // One critical section for the whole pass: concurrent evaluations
            // of the same category cannot both see it as not surfaced yet.
            let mut surfaced = self.history.lock();
            alerts.retain(|event| raise(&mut surfaced, &event.category_id, event.severity));
        }
        for event in &alerts {
            tracing::info!(
                category = %event.category_id,
                severity = %event.severity,
                "budget alert emitted"
            );
        }
        AlertReport { alerts, rejected }
    }

    /// Every alert currently in force, ignoring and leaving untouched the
    /// history.
    pub fn check_alerts(
        &self,
        thresholds: &[BudgetThreshold],
        spending: &SpendingSnapshot,
    ) -> AlertReport {
        let (alerts, rejected) = classify_all(thresholds, spending, Utc::now());
        AlertReport { alerts, rejected }
    }

    /// Commit an evaluation and hand each emitted alert to `sink`, in output
    /// order.
    pub fn evaluate_and_notify(
        &self,
        thresholds: &[BudgetThreshold],
        spending: &SpendingSnapshot,
        sink: &impl NotificationSink,
    ) -> AlertReport {
        let report = self.evaluate(thresholds, spending);
        for event in &report.alerts {
            sink.notify(event);
        }
        report
    }

    /// Commit an evaluation restricted to the budget of `category_id`,
    /// typically right after an expense in that category was recorded.
    pub fn process_expense(
        &self,
        category_id: &str,
        thresholds: &[BudgetThreshold],
        spending: &SpendingSnapshot,
    ) -> Option<AlertEvent> {
        let relevant: Vec<BudgetThreshold> = thresholds
            .iter()
            .filter(|t| t.category_id == category_id)
            .cloned()
            .collect();
        if relevant.is_empty() {
            return None;
        }
        self.evaluate(&relevant, spending).alerts.into_iter().next()
    }

    /// Forget every surfaced severity. Idempotent.
    pub fn clear_history(&self) {
        self.history.clear();
    }
}

fn classify_all(
    thresholds: &[BudgetThreshold],
    spending: &SpendingSnapshot,
    now: DateTime<Utc>,
) -> (Vec<AlertEvent>, Vec<EngineError>) {
    let mut alerts = Vec::new();
    let mut rejected = Vec::new();

    for threshold in thresholds {
        if let Err(err) = threshold.validate() {
            tracing::warn!(category = %threshold.category_id, "skipping budget threshold: {err}");
            rejected.push(err);
            continue;
        }
        let spent = spending.spent(&threshold.category_id);
        if let Some(severity) = Severity::classify(spent, threshold.limit, threshold.warn_ratio) {
            alerts.push(AlertEvent {
                category_id: threshold.category_id.clone(),
                severity,
                spent,
                limit: threshold.limit,
                generated_at: now,
            });
        }
    }

    // Stable: ties keep input order.
    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
    (alerts, rejected)
}
