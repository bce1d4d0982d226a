//! Drives one refresh of the home page: fetch, derive, reconcile, render.

use crate::aggregator::{Aggregation, Aggregator, BudgetSummary, NetStatus, SavingsPlan};
use crate::backend::{fetch_payload, Backend, Endpoint};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::ingestion::{ingest_classes, ingest_reset_dates, ingest_savings, DataAnomaly};
use crate::reconciler::{ClassView, ReconcileReport, ViewReconciler};
use crate::schema::BudgetClass;
use crate::timeseries::{ClassSeries, CycleWindow, SeriesBuilder};
use crate::utils::{compare_names, format_currency, format_date_in, format_percent};
use crate::view::{NodeId, NodeKind, TableRow, Tone, ViewNode, ViewTree};
use chrono::FixedOffset;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const SAVINGS_HEADERS: [&str; 3] = ["Category", "Percentage", "Amount to Save"];

/// Values derived once per refresh and shared by every later stage.
/// Never carried over into the next refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshContext {
    pub total_income: f64,
    pub window: Option<CycleWindow>,
    pub offset: FixedOffset,
    pub now: i64,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub context: RefreshContext,
    pub classes: Vec<BudgetClass>,
    pub aggregation: Aggregation,
    pub series: BTreeMap<String, ClassSeries>,
    pub anomalies: Vec<DataAnomaly>,
    pub report: ReconcileReport,
}

/// Top-level nodes of the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub diagnostics: NodeId,
    pub summary: NodeId,
    pub savings: NodeId,
    pub expenses: NodeId,
    pub income: NodeId,
}

impl PageLayout {
    fn build(tree: &mut ViewTree) -> Self {
        let mut section = |key: &str| tree.insert(ViewNode::new(NodeKind::Section).keyed(key));
        Self {
            diagnostics: section("diagnostics"),
            summary: section("budget_summary"),
            savings: section("savings"),
            expenses: section("bclass_expenses"),
            income: section("bclass_income"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SavingsHandles {
    button: NodeId,
    content: NodeId,
}

pub struct PageController<B: Backend> {
    backend: B,
    config: ClientConfig,
    offset: FixedOffset,
    tree: ViewTree,
    layout: PageLayout,
    reconciler: ViewReconciler,
    savings: Option<SavingsHandles>,
}

impl<B: Backend> PageController<B> {
    pub fn new(backend: B, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let offset = config.offset()?;
        let mut tree = ViewTree::new();
        let layout = PageLayout::build(&mut tree);
        let reconciler =
            ViewReconciler::new(layout.expenses, layout.income, config.refresh_policy, offset);

        Ok(Self {
            backend,
            config,
            offset,
            tree,
            layout,
            reconciler,
            savings: None,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    /// Mutable access for user interaction such as toggling a disclosure.
    pub fn tree_mut(&mut self) -> &mut ViewTree {
        &mut self.tree
    }

    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    pub fn reconciler(&self) -> &ViewReconciler {
        &self.reconciler
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.tree.text_lines(self.layout.diagnostics)
    }

    pub async fn refresh(&mut self, now: i64) -> Result<RefreshOutcome> {
        self.refresh_as_of(now, None).await
    }

    /// Runs one full refresh. `as_of` asks the backend for classes as they
    /// stood at that unix time.
    ///
    /// The three fetches are issued together, but failures are reported in
    /// fetch order and the first one ends the refresh.
    pub async fn refresh_as_of(&mut self, now: i64, as_of: Option<i64>) -> Result<RefreshOutcome> {
        self.clear_diagnostics();
        self.add_diagnostic("Contacting server...", None);

        let body = as_of.map(|datetime| json!({ "datetime": datetime }));
        let (classes, resets, savings) = futures::join!(
            fetch_payload(&self.backend, Endpoint::Classes, body.as_ref()),
            fetch_payload(&self.backend, Endpoint::ResetDates, None),
            fetch_payload(&self.backend, Endpoint::Savings, None),
        );
        let classes = self.checked(Endpoint::Classes, classes)?;
        let resets = self.checked(Endpoint::ResetDates, resets)?;
        let savings = self.checked(Endpoint::Savings, savings)?;
        self.clear_diagnostics();

        let mut anomalies = Vec::new();
        let classes = ingest_classes(classes);
        anomalies.extend(classes.anomalies);
        let resets = ingest_reset_dates(resets);
        anomalies.extend(resets.anomalies);
        let savings = ingest_savings(savings);
        anomalies.extend(savings.anomalies);

        let mut classes = classes.records;
        classes.sort_by(|a, b| compare_names(&a.name, &b.name));
        let mut resets = resets.records;
        resets.sort_unstable();
        let mut savings = savings.records;
        savings.sort_by(|a, b| compare_names(&a.category, &b.category));

        let aggregator = Aggregator::new(&classes);
        let context = RefreshContext {
            total_income: aggregator.total_income(),
            window: CycleWindow::from_reset_dates(&resets),
            offset: self.offset,
            now,
        };
        info!(
            "Refreshing {} classes (income {:.2}, cycle {:?})",
            classes.len(),
            context.total_income,
            context.window
        );

        let aggregation = aggregator.aggregate(&resets, &savings);

        let mut series = BTreeMap::new();
        match context.window {
            Some(window) => {
                let builder = SeriesBuilder::new(window, context.offset, context.now);
                for class in &classes {
                    if let Some(s) = builder.build(class, context.total_income) {
                        series.insert(class.id.clone(), s);
                    }
                }
            }
            None => warn!("No reset dates available; charts are skipped"),
        }

        let views: Vec<ClassView<'_>> = classes
            .iter()
            .filter_map(|class| {
                aggregation.per_class.get(&class.id).map(|summary| ClassView {
                    class,
                    summary,
                    series: series.get(&class.id),
                })
            })
            .collect();
        let report = self.reconciler.reconcile(&mut self.tree, &views);
        debug!(
            "Reconciled view: {} classes built, {} patched, {} nodes created",
            report.classes_built, report.classes_patched, report.nodes_created
        );

        self.render_summary(&aggregation.summary);
        self.render_savings(&aggregation.savings);

        Ok(RefreshOutcome {
            context,
            classes,
            aggregation,
            series,
            anomalies,
            report,
        })
    }

    fn checked(&mut self, endpoint: Endpoint, result: Result<Vec<Value>>) -> Result<Vec<Value>> {
        result.map_err(|e| {
            warn!("{} failed: {}", endpoint.path(), e);
            self.clear_diagnostics();
            self.add_diagnostic(
                format!("{} ({})", endpoint.failure_message(), e),
                Some(Tone::Error),
            );
            e
        })
    }

    fn clear_diagnostics(&mut self) {
        self.tree.clear_children(self.layout.diagnostics);
    }

    fn add_diagnostic(&mut self, message: impl Into<String>, tone: Option<Tone>) {
        let mut node = ViewNode::text(message);
        node.tone = tone;
        self.tree.insert_child(self.layout.diagnostics, node);
    }

    fn render_summary(&mut self, summary: &BudgetSummary) {
        let section = self.layout.summary;
        self.tree.clear_children(section);

        let lines = [
            (
                format!("Total expenses: {}", format_currency(summary.total_expense)),
                Tone::Expense,
            ),
            (
                format!("Total income: {}", format_currency(summary.total_income)),
                Tone::Income,
            ),
            match summary.net_status {
                NetStatus::BrokenEven => (summary.net_status.label().to_string(), Tone::Neutral),
                NetStatus::Surplus => (
                    format!("{}{}", summary.net_status.label(), format_currency(summary.net)),
                    Tone::Favorable,
                ),
                NetStatus::Deficit => (
                    format!("{}{}", summary.net_status.label(), format_currency(summary.net)),
                    Tone::Unfavorable,
                ),
            },
        ];
        for (text, tone) in lines {
            self.tree.insert_child(section, ViewNode::text(text).toned(tone));
        }

        if let Some(next) = summary.next_reset_date {
            self.tree.insert_child(
                section,
                ViewNode::text(format!("Next reset: {}", format_date_in(next, self.offset)))
                    .toned(Tone::Accent),
            );
        }
    }

    /// The savings disclosure is built once; its label and table follow
    /// every refresh since they derive only from the latest fetch.
    fn render_savings(&mut self, plan: &SavingsPlan) {
        let indicator = format_currency(plan.total_saved());
        let handles = match self.savings {
            Some(handles) => {
                self.tree.set_indicator(handles.button, indicator);
                self.tree.clear_children(handles.content);
                handles
            }
            None => {
                let button = self.tree.insert_child(
                    self.layout.savings,
                    ViewNode::new(NodeKind::DisclosureButton {
                        title: "Savings".to_string(),
                        indicator,
                        expanded: false,
                    })
                    .keyed("savings_btn")
                    .toned(Tone::Accent),
                );
                let content = self.tree.insert_child(
                    self.layout.savings,
                    ViewNode::new(NodeKind::DisclosureContent).keyed("savings_content"),
                );
                let handles = SavingsHandles { button, content };
                self.savings = Some(handles);
                handles
            }
        };

        let intro = if plan.has_surplus() {
            "Take your savings and split them into these categories."
        } else {
            "You don't have extra money for savings."
        };
        self.tree.insert_child(handles.content, ViewNode::text(intro));

        let rows = plan
            .allocations
            .iter()
            .map(|a| TableRow {
                key: Some(a.category.clone()),
                cells: vec![
                    a.category.clone(),
                    format_percent(a.percent),
                    format_currency(a.amount),
                ],
                href: None,
            })
            .collect();
        self.tree.insert_child(
            handles.content,
            ViewNode::new(NodeKind::Table {
                headers: SAVINGS_HEADERS.iter().map(|h| h.to_string()).collect(),
                rows,
            })
            .toned(Tone::Accent),
        );
    }
}
