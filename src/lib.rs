//! # Snowbudget Client
//!
//! The summary and view engine behind the snowbudget home page. It turns the
//! budget classes, reset dates and savings categories served by the backend
//! into derived figures, and keeps a retained view tree in step with them
//! across refreshes.
//!
//! ## Core Concepts
//!
//! - **Budget class**: a named expense or income bucket with an optional target
//!   and a history of transactions
//! - **Aggregation**: totals, per-class target standing and a savings split,
//!   recomputed from scratch on every refresh
//! - **Cycle window**: the span between reset dates used to chart cumulative
//!   spending per day
//! - **Reconciliation**: per-class view structure is built once and then
//!   patched, so open disclosures survive a refresh
//!
//! ## Example
//!
//! ```rust,ignore
//! use snowbudget_client::*;
//!
//! let config = ClientConfig::default();
//! let backend = HttpBackend::new(config.clone());
//! let mut page = PageController::new(backend, config)?;
//!
//! let outcome = page.refresh(chrono::Utc::now().timestamp()).await?;
//! println!("net: {}", format_currency(outcome.aggregation.summary.net));
//! for line in page.tree().text_lines(page.layout().summary) {
//!     println!("{}", line);
//! }
//! ```

pub mod aggregator;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod ingestion;
pub mod reconciler;
pub mod schema;
pub mod timeseries;
pub mod utils;
pub mod view;

pub use aggregator::{
    Aggregation, Aggregator, BudgetSummary, ClassSummary, NetStatus, Outlook, SavingsAllocation,
    SavingsPlan, TargetPosition, TargetStatus,
};
#[cfg(feature = "http")]
pub use backend::HttpBackend;
pub use backend::{fetch_payload, Backend, Endpoint, Method};
pub use config::{ClientConfig, RefreshPolicy, DEFAULT_BASE_URL};
pub use controller::{PageController, PageLayout, RefreshContext, RefreshOutcome};
pub use error::{BudgetError, Result};
pub use ingestion::*;
pub use reconciler::{ClassHandles, ClassView, Placement, ReconcileReport, ViewReconciler};
pub use schema::*;
pub use timeseries::{ClassSeries, CycleWindow, SeriesBuilder, TargetLine};
pub use utils::*;
pub use view::{NodeId, NodeKind, TableRow, Tone, ViewNode, ViewTree};

use log::info;
use serde_json::Value;

/// Ingests raw payloads and aggregates them without touching any view.
///
/// Records and savings categories are ordered the way a page refresh orders
/// them. Malformed records are skipped and only logged; use the `ingest_*`
/// functions directly to inspect them.
pub fn summarize(
    raw_classes: Vec<Value>,
    raw_reset_dates: Vec<Value>,
    raw_savings: Vec<Value>,
) -> Aggregation {
    let mut classes = ingest_classes(raw_classes).records;
    classes.sort_by(|a, b| compare_names(&a.name, &b.name));
    let mut resets = ingest_reset_dates(raw_reset_dates).records;
    resets.sort_unstable();
    let mut savings = ingest_savings(raw_savings).records;
    savings.sort_by(|a, b| compare_names(&a.category, &b.category));

    let aggregation = Aggregator::new(&classes).aggregate(&resets, &savings);
    info!(
        "Summarized {} classes: expenses {:.2}, income {:.2}",
        classes.len(),
        aggregation.summary.total_expense,
        aggregation.summary.total_income
    );
    aggregation
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expense_and_income_totals() {
        let classes = vec![
            json!({"id": "c1", "name": "Rent", "type": "expense", "history": [{"id": "t1", "price": 50, "timestamp": 0}]}),
            json!({"id": "c2", "name": "Job", "type": "income", "history": [{"id": "t2", "price": 200, "timestamp": 0}]}),
        ];

        let aggregation = summarize(classes, vec![], vec![]);

        assert_eq!(aggregation.summary.total_expense, 50.0);
        assert_eq!(aggregation.summary.total_income, 200.0);
        assert_eq!(aggregation.summary.net, 150.0);
        assert_eq!(aggregation.summary.net_status, NetStatus::Surplus);
        assert_eq!(aggregation.summary.next_reset_date, None);
    }

    #[test]
    fn test_percent_target_resolves_against_income() {
        let classes = vec![
            json!({
                "id": "food", "name": "Food", "type": "e",
                "target": {"type": "percent_income", "value": 0.1},
                "history": [{"id": "t1", "price": 120, "timestamp": 0}]
            }),
            json!({"id": "pay", "name": "Pay", "type": "i", "history": [{"id": "t2", "price": 1000, "timestamp": 0}]}),
        ];

        let aggregation = summarize(classes, vec![json!(300), json!(100)], vec![]);
        let food = &aggregation.per_class["food"];
        let target = food.target.expect("target");

        assert_eq!(target.effective, 100.0);
        assert_eq!(target.delta, 20.0);
        assert_eq!(target.outlook, Outlook::Unfavorable);
        assert_eq!(aggregation.summary.next_reset_date, Some(100));
    }

    #[test]
    fn test_malformed_class_is_skipped() {
        let classes = vec![
            json!({"id": "ok", "name": "Ok", "type": "expense", "history": [{"id": "t1", "price": 5, "timestamp": 0}]}),
            json!({"id": "bad", "name": "Bad", "history": [{"id": "t2", "price": 500, "timestamp": 0}]}),
        ];

        let aggregation = summarize(classes, vec![], vec![]);

        assert_eq!(aggregation.summary.total_expense, 5.0);
        assert!(!aggregation.per_class.contains_key("bad"));
    }

    #[test]
    fn test_savings_sorted_by_category() {
        let classes = vec![
            json!({"id": "pay", "name": "Pay", "type": "income", "history": [{"id": "t1", "price": 100, "timestamp": 0}]}),
        ];
        let savings = vec![
            json!({"category": "travel", "percent": 0.5}),
            json!({"category": "Emergency", "percent": 0.25}),
        ];

        let aggregation = summarize(classes, vec![], savings);
        let order: Vec<&str> = aggregation
            .savings
            .allocations
            .iter()
            .map(|a| a.category.as_str())
            .collect();

        assert_eq!(order, vec!["Emergency", "travel"]);
        assert_eq!(aggregation.savings.allocations[0].amount, 25.0);
    }
}
