//! Maps budget classes onto the view tree without rebuilding what already exists.
//!
//! Each class owns at most one container, one disclosure button and one
//! disclosure content node for the life of the page. The reconciler keeps its
//! own id -> handles map instead of searching the tree.

use crate::aggregator::ClassSummary;
use crate::config::RefreshPolicy;
use crate::schema::{BudgetClass, ClassType};
use crate::timeseries::ClassSeries;
use crate::utils::{format_currency, format_date_in};
use crate::view::{NodeId, NodeKind, TableRow, Tone, ViewNode, ViewTree};
use chrono::FixedOffset;
use log::{debug, warn};
use std::collections::HashMap;

pub const CHART_TITLE: &str = "Total Over Time (across current cycle)";
const HISTORY_HEADERS: [&str; 4] = ["Date", "Price", "Vendor", "Description"];

/// Everything the reconciler needs to know about one class for this pass.
#[derive(Debug, Clone, Copy)]
pub struct ClassView<'a> {
    pub class: &'a BudgetClass,
    pub summary: &'a ClassSummary,
    pub series: Option<&'a ClassSeries>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Expenses,
    Income,
    /// Classes of unknown type are built but never attached to the page.
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassHandles {
    pub placement: Placement,
    pub container: NodeId,
    pub button: Option<NodeId>,
    pub content: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub nodes_created: usize,
    pub classes_built: usize,
    pub classes_patched: usize,
}

pub struct ViewReconciler {
    expenses: NodeId,
    income: NodeId,
    policy: RefreshPolicy,
    offset: FixedOffset,
    handles: HashMap<String, ClassHandles>,
}

impl ViewReconciler {
    pub fn new(expenses: NodeId, income: NodeId, policy: RefreshPolicy, offset: FixedOffset) -> Self {
        Self {
            expenses,
            income,
            policy,
            offset,
            handles: HashMap::new(),
        }
    }

    pub fn handles(&self, class_id: &str) -> Option<&ClassHandles> {
        self.handles.get(class_id)
    }

    pub fn tracked(&self) -> usize {
        self.handles.len()
    }

    pub fn reconcile(&mut self, tree: &mut ViewTree, views: &[ClassView<'_>]) -> ReconcileReport {
        let before = tree.created();
        let mut report = ReconcileReport::default();

        for view in views {
            let built = self.reconcile_class(tree, view);
            if built {
                report.classes_built += 1;
            } else if self.policy == RefreshPolicy::Live {
                report.classes_patched += 1;
            }
        }

        report.nodes_created = tree.created() - before;
        report
    }

    /// Returns true when the class's content was constructed on this pass.
    fn reconcile_class(&mut self, tree: &mut ViewTree, view: &ClassView<'_>) -> bool {
        let class = view.class;
        let mut handles = match self.handles.get(&class.id) {
            Some(handles) => *handles,
            None => self.build_container(tree, class),
        };

        match handles.button {
            None => {
                let button = tree.insert_child(
                    handles.container,
                    ViewNode::new(NodeKind::DisclosureButton {
                        title: class.name.clone(),
                        indicator: view.summary.indicator_text(),
                        expanded: false,
                    })
                    .keyed(format!("{}_btn", class.id))
                    .toned(class_tone(&class.class_type)),
                );
                handles.button = Some(button);
            }
            Some(button) if self.policy == RefreshPolicy::Live => {
                tree.set_indicator(button, view.summary.indicator_text());
            }
            Some(_) => {}
        }

        let built = match handles.content {
            None => {
                let content = tree.insert_child(
                    handles.container,
                    ViewNode::new(NodeKind::DisclosureContent).keyed(format!("{}_content", class.id)),
                );
                self.fill_content(tree, content, view);
                handles.content = Some(content);
                debug!("Built view for class {} ({})", class.id, class.name);
                true
            }
            Some(content) if self.policy == RefreshPolicy::Live => {
                tree.clear_children(content);
                self.fill_content(tree, content, view);
                false
            }
            Some(_) => false,
        };

        self.handles.insert(class.id.clone(), handles);
        built
    }

    fn build_container(&self, tree: &mut ViewTree, class: &BudgetClass) -> ClassHandles {
        let node = ViewNode::new(NodeKind::Container)
            .keyed(class.id.clone())
            .toned(class_tone(&class.class_type));
        let (placement, container) = match class.class_type {
            ClassType::Expense => (Placement::Expenses, tree.insert_child(self.expenses, node)),
            ClassType::Income => (Placement::Income, tree.insert_child(self.income, node)),
            ClassType::Other(ref raw) => {
                warn!("Found budget class of unknown type '{}': {}", raw, class.id);
                (Placement::Detached, tree.insert(node))
            }
        };

        ClassHandles {
            placement,
            container,
            button: None,
            content: None,
        }
    }

    fn fill_content(&self, tree: &mut ViewTree, content: NodeId, view: &ClassView<'_>) {
        let class = view.class;

        tree.insert_child(content, ViewNode::text(class.description.clone()));
        if let Some(status) = &view.summary.target {
            tree.insert_child(
                content,
                ViewNode::text(status.message()).toned(status.outlook.into()),
            );
        }

        if class.history.is_empty() {
            tree.insert_child(content, ViewNode::text(""));
        } else {
            let rows = class
                .sorted_history()
                .into_iter()
                .map(|t| {
                    let mut price = format_currency(t.price);
                    if t.recurring {
                        price.push_str(" (R)");
                    }
                    TableRow {
                        key: Some(t.id.clone()),
                        cells: vec![
                            format_date_in(t.timestamp, self.offset),
                            price,
                            t.vendor.clone(),
                            t.description.clone(),
                        ],
                        href: Some(format!("editt.html?transaction_id={}", t.id)),
                    }
                })
                .collect();
            tree.insert_child(
                content,
                ViewNode::new(NodeKind::Table {
                    headers: HISTORY_HEADERS.iter().map(|h| h.to_string()).collect(),
                    rows,
                })
                .toned(class_tone(&class.class_type)),
            );
        }

        if let Some(series) = view.series {
            tree.insert_child(
                content,
                ViewNode::new(NodeKind::Chart {
                    title: CHART_TITLE.to_string(),
                    series: series.clone(),
                })
                .keyed(format!("{}_chart1", class.id)),
            );
        }

        tree.insert_child(
            content,
            ViewNode::new(NodeKind::Action {
                label: "Edit Class".to_string(),
                href: format!("editc.html?class_id={}", class.id),
            })
            .keyed(format!("{}_btn_edit", class.id)),
        );
    }
}

fn class_tone(class_type: &ClassType) -> Tone {
    match class_type {
        ClassType::Expense => Tone::Expense,
        ClassType::Income => Tone::Income,
        ClassType::Other(_) => Tone::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::schema::{Target, Transaction};
    use crate::utils::utc_offset;
    use std::collections::BTreeMap;

    fn transaction(id: &str, price: f64, timestamp: i64) -> Transaction {
        Transaction {
            id: id.to_string(),
            class_id: String::new(),
            price,
            vendor: "Shop".to_string(),
            description: String::new(),
            timestamp,
            recurring: false,
        }
    }

    fn class(id: &str, class_type: ClassType, history: Vec<Transaction>) -> BudgetClass {
        BudgetClass {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: format!("{} description", id),
            class_type,
            keywords: vec![],
            target: None,
            history,
        }
    }

    fn setup(policy: RefreshPolicy) -> (ViewTree, ViewReconciler) {
        let mut tree = ViewTree::new();
        let expenses = tree.insert(ViewNode::new(NodeKind::Section).keyed("bclass_expenses"));
        let income = tree.insert(ViewNode::new(NodeKind::Section).keyed("bclass_income"));
        let reconciler = ViewReconciler::new(expenses, income, policy, utc_offset());
        (tree, reconciler)
    }

    fn pass(tree: &mut ViewTree, reconciler: &mut ViewReconciler, classes: &[BudgetClass]) -> ReconcileReport {
        let per_class: BTreeMap<String, ClassSummary> = Aggregator::new(classes).per_class();
        let views: Vec<ClassView<'_>> = classes
            .iter()
            .map(|c| ClassView {
                class: c,
                summary: &per_class[&c.id],
                series: None,
            })
            .collect();
        reconciler.reconcile(tree, &views)
    }

    fn content_lines(tree: &ViewTree, reconciler: &ViewReconciler, id: &str) -> Vec<String> {
        let content = reconciler.handles(id).unwrap().content.unwrap();
        tree.text_lines(content)
    }

    #[test]
    fn test_places_classes_by_type() {
        let (mut tree, mut reconciler) = setup(RefreshPolicy::Frozen);
        let classes = vec![
            class("food", ClassType::Expense, vec![]),
            class("pay", ClassType::Income, vec![]),
            class("odd", ClassType::Other("x".to_string()), vec![]),
        ];
        pass(&mut tree, &mut reconciler, &classes);

        assert_eq!(reconciler.handles("food").unwrap().placement, Placement::Expenses);
        assert_eq!(reconciler.handles("pay").unwrap().placement, Placement::Income);
        assert_eq!(reconciler.handles("odd").unwrap().placement, Placement::Detached);
        assert_eq!(tree.children(reconciler.expenses).len(), 1);
        assert_eq!(tree.children(reconciler.income).len(), 1);

        let food = reconciler.handles("food").unwrap();
        assert_eq!(tree.find_keyed(reconciler.expenses, "food_btn"), food.button);
        assert_eq!(tree.find_keyed(reconciler.expenses, "food_content"), food.content);
        assert!(tree.find_keyed(reconciler.expenses, "food_btn_edit").is_some());
    }

    #[test]
    fn test_second_pass_creates_nothing() {
        let (mut tree, mut reconciler) = setup(RefreshPolicy::Frozen);
        let classes = vec![
            class("food", ClassType::Expense, vec![transaction("t1", 5.0, 100)]),
            class("pay", ClassType::Income, vec![]),
            class("odd", ClassType::Other("x".to_string()), vec![]),
        ];

        let first = pass(&mut tree, &mut reconciler, &classes);
        let count = tree.len();
        let second = pass(&mut tree, &mut reconciler, &classes);

        assert!(first.nodes_created > 0);
        assert_eq!(first.classes_built, 3);
        assert_eq!(second.nodes_created, 0);
        assert_eq!(second.classes_built, 0);
        assert_eq!(tree.len(), count);
        assert_eq!(reconciler.tracked(), 3);
    }

    #[test]
    fn test_frozen_content_keeps_first_history() {
        let (mut tree, mut reconciler) = setup(RefreshPolicy::Frozen);
        let first = vec![class("food", ClassType::Expense, vec![transaction("t1", 5.0, 100)])];
        pass(&mut tree, &mut reconciler, &first);

        let second = vec![class(
            "food",
            ClassType::Expense,
            vec![transaction("t1", 5.0, 100), transaction("t2", 7.0, 200)],
        )];
        pass(&mut tree, &mut reconciler, &second);

        let lines = content_lines(&tree, &reconciler, "food");
        assert!(lines.iter().any(|l| l.contains("$5.00")));
        assert!(!lines.iter().any(|l| l.contains("$7.00")));

        let button = reconciler.handles("food").unwrap().button.unwrap();
        assert_eq!(tree.text_lines(button), vec!["FOOD $5.00"]);
    }

    #[test]
    fn test_live_policy_patches_in_place() {
        let (mut tree, mut reconciler) = setup(RefreshPolicy::Live);
        let first = vec![class("food", ClassType::Expense, vec![transaction("t1", 5.0, 100)])];
        pass(&mut tree, &mut reconciler, &first);

        let handles = *reconciler.handles("food").unwrap();
        let button = handles.button.unwrap();
        tree.toggle(button);

        let second = vec![class(
            "food",
            ClassType::Expense,
            vec![transaction("t1", 5.0, 100), transaction("t2", 7.0, 200)],
        )];
        let report = pass(&mut tree, &mut reconciler, &second);

        assert_eq!(report.classes_patched, 1);
        assert_eq!(*reconciler.handles("food").unwrap(), handles);
        assert!(tree.is_expanded(button));
        assert_eq!(tree.text_lines(button), vec!["FOOD $12.00"]);
        let lines = content_lines(&tree, &reconciler, "food");
        assert!(lines.iter().any(|l| l.contains("$7.00")));
    }

    #[test]
    fn test_content_layout() {
        let (mut tree, mut reconciler) = setup(RefreshPolicy::Frozen);
        let mut food = class(
            "food",
            ClassType::Expense,
            vec![transaction("old", 5.0, 0), transaction("new", 7.0, 86_400 * 2)],
        );
        food.history[1].recurring = true;
        food.target = Some(Target::dollar(20.0));
        pass(&mut tree, &mut reconciler, &[food]);

        let lines = content_lines(&tree, &reconciler, "food");
        assert_eq!(
            lines,
            vec![
                "food description",
                "This class is under the target by $8.00.",
                "Date | Price | Vendor | Description",
                "1970-1-3 | $7.00 (R) | Shop | ",
                "1970-1-1 | $5.00 | Shop | ",
                "Edit Class",
            ]
        );
    }
}
