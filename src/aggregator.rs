//! Folds a refresh's budget classes into totals, per-class target standing
//! and a savings split.

use crate::schema::{BudgetClass, ClassType, SavingsCategory};
use crate::utils::format_currency;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetStatus {
    Surplus,
    Deficit,
    BrokenEven,
}

impl NetStatus {
    pub fn from_net(net: f64) -> Self {
        if net > 0.0 {
            Self::Surplus
        } else if net < 0.0 {
            Self::Deficit
        } else {
            Self::BrokenEven
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Surplus => "Extra cash: ",
            Self::Deficit => "In-the-hole: ",
            Self::BrokenEven => "Broken even!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetPosition {
    Under,
    Exact,
    Over,
}

/// Whether a class's standing against its target is good news. Under target
/// is good for an expense and bad for income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outlook {
    Favorable,
    Neutral,
    Unfavorable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetStatus {
    pub effective: f64,
    /// `sum - effective`; negative means under target
    pub delta: f64,
    pub position: TargetPosition,
    pub outlook: Outlook,
}

impl TargetStatus {
    pub fn evaluate(class: &BudgetClass, sum: f64, total_income: f64) -> Option<Self> {
        let effective = class.target_value(total_income)?;
        let delta = sum - effective;
        let position = if delta < 0.0 {
            TargetPosition::Under
        } else if delta > 0.0 {
            TargetPosition::Over
        } else {
            TargetPosition::Exact
        };
        let outlook = match (&class.class_type, position) {
            (_, TargetPosition::Exact) | (ClassType::Other(_), _) => Outlook::Neutral,
            (ClassType::Expense, TargetPosition::Under) | (ClassType::Income, TargetPosition::Over) => {
                Outlook::Favorable
            }
            _ => Outlook::Unfavorable,
        };

        Some(Self {
            effective,
            delta,
            position,
            outlook,
        })
    }

    pub fn message(&self) -> String {
        match self.position {
            TargetPosition::Exact => "This class is exactly on target.".to_string(),
            TargetPosition::Under => format!(
                "This class is under the target by {}.",
                format_currency(self.delta.abs())
            ),
            TargetPosition::Over => format!(
                "This class is over the target by {}.",
                format_currency(self.delta.abs())
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub sum: f64,
    pub target: Option<TargetStatus>,
}

impl ClassSummary {
    /// Right-hand text of the class's disclosure button: `$sum` or `$sum / $target`.
    pub fn indicator_text(&self) -> String {
        match &self.target {
            Some(target) => format!(
                "{} / {}",
                format_currency(self.sum),
                format_currency(target.effective)
            ),
            None => format_currency(self.sum),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_expense: f64,
    pub total_income: f64,
    pub net: f64,
    pub net_status: NetStatus,
    /// Earliest upcoming reset boundary, if the backend returned any
    pub next_reset_date: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsAllocation {
    pub category: String,
    pub percent: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsPlan {
    pub surplus: f64,
    pub allocations: Vec<SavingsAllocation>,
}

impl SavingsPlan {
    /// Percentages are applied independently; they need not sum to one.
    pub fn allocate(surplus: f64, categories: &[SavingsCategory]) -> Self {
        let allocations = categories
            .iter()
            .map(|c| SavingsAllocation {
                category: c.category.clone(),
                percent: c.percent,
                amount: if surplus > 0.0 { c.percent * surplus } else { 0.0 },
            })
            .collect();

        Self {
            surplus,
            allocations,
        }
    }

    pub fn has_surplus(&self) -> bool {
        self.surplus > 0.0
    }

    pub fn total_saved(&self) -> f64 {
        self.allocations.iter().map(|a| a.amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub summary: BudgetSummary,
    pub per_class: BTreeMap<String, ClassSummary>,
    pub savings: SavingsPlan,
}

pub struct Aggregator<'a> {
    classes: &'a [BudgetClass],
    total_income: f64,
    total_expense: f64,
}

impl<'a> Aggregator<'a> {
    /// Totals are computed here, before any target can be resolved.
    pub fn new(classes: &'a [BudgetClass]) -> Self {
        let total_income: f64 = classes
            .iter()
            .filter(|c| c.is_income())
            .map(BudgetClass::sum)
            .sum();
        let total_expense: f64 = classes
            .iter()
            .filter(|c| c.is_expense())
            .map(BudgetClass::sum)
            .sum();

        Self {
            classes,
            total_income,
            total_expense,
        }
    }

    pub fn total_income(&self) -> f64 {
        self.total_income
    }

    pub fn total_expense(&self) -> f64 {
        self.total_expense
    }

    pub fn net(&self) -> f64 {
        self.total_income - self.total_expense
    }

    pub fn summary(&self, reset_dates: &[i64]) -> BudgetSummary {
        let net = self.net();
        BudgetSummary {
            total_expense: self.total_expense,
            total_income: self.total_income,
            net,
            net_status: NetStatus::from_net(net),
            next_reset_date: reset_dates.first().copied(),
        }
    }

    pub fn class_summary(&self, class: &BudgetClass) -> ClassSummary {
        let sum = class.sum();
        ClassSummary {
            sum,
            target: TargetStatus::evaluate(class, sum, self.total_income),
        }
    }

    pub fn per_class(&self) -> BTreeMap<String, ClassSummary> {
        let mut per_class = BTreeMap::new();
        for class in self.classes {
            if !class.class_type.is_recognized() {
                debug!(
                    "Class {} has type '{}' and is excluded from totals",
                    class.id, class.class_type
                );
            }
            per_class.insert(class.id.clone(), self.class_summary(class));
        }
        per_class
    }

    pub fn savings(&self, categories: &[SavingsCategory]) -> SavingsPlan {
        SavingsPlan::allocate(self.net(), categories)
    }

    /// `reset_dates` must be sorted ascending.
    pub fn aggregate(&self, reset_dates: &[i64], categories: &[SavingsCategory]) -> Aggregation {
        Aggregation {
            summary: self.summary(reset_dates),
            per_class: self.per_class(),
            savings: self.savings(categories),
        }
    }
}
