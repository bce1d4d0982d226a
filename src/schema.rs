use crate::error::{BudgetError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Whether a budget class tracks money going out or coming in.
///
/// The backend is loose about spelling, so parsing accepts the single-letter
/// aliases in any case. Anything else is kept verbatim and classifies as
/// neither expense nor income.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClassType {
    Expense,
    Income,
    Other(String),
}

impl ClassType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "e" | "expense" => Self::Expense,
            "i" | "income" => Self::Income,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for ClassType {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ClassType> for String {
    fn from(class_type: ClassType) -> Self {
        class_type.to_string()
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expense => write!(f, "expense"),
            Self::Income => write!(f, "income"),
            Self::Other(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    #[schemars(description = "A flat dollar amount for the current cycle")]
    Dollar,

    #[schemars(description = "A fraction of the cycle's total income (0.1 = 10%)")]
    PercentIncome,
}

impl TargetType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "dollar" => Some(Self::Dollar),
            "percent_income" => Some(Self::PercentIncome),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Target {
    #[serde(rename = "type")]
    pub target_type: TargetType,
    pub value: f64,
}

impl Target {
    pub fn dollar(value: f64) -> Self {
        Self {
            target_type: TargetType::Dollar,
            value,
        }
    }

    pub fn percent_of_income(value: f64) -> Self {
        Self {
            target_type: TargetType::PercentIncome,
            value,
        }
    }

    /// Resolves the goal amount. `total_income` must be the complete income
    /// figure for the refresh; it is ignored for dollar targets.
    pub fn effective_value(&self, total_income: f64) -> f64 {
        match self.target_type {
            TargetType::Dollar => self.value,
            TargetType::PercentIncome => self.value * total_income,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Transaction {
    #[schemars(description = "Unique, server-assigned transaction id")]
    pub id: String,

    #[serde(default)]
    #[schemars(description = "Id of the owning budget class. Filled in from the owner when absent.")]
    pub class_id: String,

    #[schemars(description = "Magnitude of the transaction; the sign is implied by the class type")]
    pub price: f64,

    #[serde(default)]
    pub vendor: String,

    #[serde(default)]
    pub description: String,

    #[serde(deserialize_with = "unix_seconds")]
    #[schemars(with = "i64", description = "Unix seconds; fractional values are truncated")]
    pub timestamp: i64,

    #[serde(default)]
    pub recurring: bool,
}

fn unix_seconds<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Err(serde::de::Error::custom("timestamp must be finite"));
    }
    Ok(raw.floor() as i64)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BudgetClass {
    #[schemars(description = "Unique, server-assigned id. Stable across refreshes.")]
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "type")]
    #[schemars(with = "String", description = "\"expense\" or \"income\" (aliases \"e\"/\"i\")")]
    pub class_type: ClassType,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub target: Option<Target>,

    #[serde(default)]
    #[schemars(description = "Transactions owned by this class, unordered")]
    pub history: Vec<Transaction>,
}

impl BudgetClass {
    pub fn is_expense(&self) -> bool {
        self.class_type == ClassType::Expense
    }

    pub fn is_income(&self) -> bool {
        self.class_type == ClassType::Income
    }

    /// Sum of every transaction price. An empty history sums to zero.
    pub fn sum(&self) -> f64 {
        self.history.iter().map(|t| t.price).sum()
    }

    pub fn target_value(&self, total_income: f64) -> Option<f64> {
        self.target.map(|t| t.effective_value(total_income))
    }

    /// History ordered newest first, the order the transaction table shows.
    pub fn sorted_history(&self) -> Vec<&Transaction> {
        let mut history: Vec<&Transaction> = self.history.iter().collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(BudgetClass)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SavingsCategory {
    #[schemars(description = "Display name, unique among savings categories")]
    pub category: String,

    #[schemars(description = "Share of any income surplus to set aside, in [0, 1]")]
    pub percent: f64,
}

/// Every backend response is wrapped in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub payload: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwraps the payload, refusing to look at it when the server reported failure.
    pub fn into_payload(self, endpoint: &str) -> Result<T> {
        if !self.success {
            return Err(BudgetError::Server {
                endpoint: endpoint.to_string(),
                message: self.message,
            });
        }
        self.payload
            .ok_or_else(|| BudgetError::MissingPayload(endpoint.to_string()))
    }
}
