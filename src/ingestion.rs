//! Validation of raw backend payloads into typed records.
//!
//! A bad record never aborts a refresh. It is dropped (or, for a bad target,
//! detached from its class), logged, and reported back as a [`DataAnomaly`].

use crate::error::BudgetError;
use crate::schema::{BudgetClass, ClassType, SavingsCategory, Target, TargetType, Transaction};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAnomaly {
    /// Best available identification of the offending record
    pub record: String,
    pub reason: String,
}

impl DataAnomaly {
    fn new(record: impl Into<String>, reason: impl Into<String>) -> Self {
        let anomaly = Self {
            record: record.into(),
            reason: reason.into(),
        };
        warn!("Malformed record {}: {}", anomaly.record, anomaly.reason);
        anomaly
    }

    fn from_error(record: impl Into<String>, error: BudgetError) -> Self {
        Self::new(record, error.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub records: Vec<T>,
    pub anomalies: Vec<DataAnomaly>,
}

impl<T> Default for Ingested<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            anomalies: Vec::new(),
        }
    }
}

impl<T> Ingested<T> {
    fn push(&mut self, record: T) {
        self.records.push(record);
    }

    fn flag(&mut self, anomaly: DataAnomaly) {
        self.anomalies.push(anomaly);
    }
}

#[derive(Debug, Deserialize)]
struct WireClass {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    class_type: Option<Value>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    target: Option<Value>,
    #[serde(default)]
    history: Vec<Value>,
}

pub fn ingest_classes(raw: Vec<Value>) -> Ingested<BudgetClass> {
    let mut ingested = Ingested::default();

    for (idx, value) in raw.into_iter().enumerate() {
        let label = record_label(&value, idx);
        let wire: WireClass = match serde_json::from_value(value) {
            Ok(wire) => wire,
            Err(e) => {
                ingested.flag(DataAnomaly::from_error(label, e.into()));
                continue;
            }
        };

        let class_type = match wire.class_type.as_ref().and_then(Value::as_str) {
            Some(raw_type) => ClassType::parse(raw_type),
            None => {
                ingested.flag(DataAnomaly::new(
                    &wire.id,
                    "class has no \"type\" string",
                ));
                continue;
            }
        };
        if let ClassType::Other(raw_type) = &class_type {
            ingested.flag(DataAnomaly::new(
                &wire.id,
                format!("unknown class type '{}'", raw_type),
            ));
        }

        let target = match wire.target {
            None | Some(Value::Null) => None,
            Some(raw_target) => match parse_target(&raw_target) {
                Ok(target) => Some(target),
                Err(e) => {
                    ingested.flag(DataAnomaly::from_error(format!("{}.target", wire.id), e));
                    None
                }
            },
        };

        let mut history = Vec::with_capacity(wire.history.len());
        for (t_idx, raw_transaction) in wire.history.into_iter().enumerate() {
            let t_label = format!("{}/{}", wire.id, record_label(&raw_transaction, t_idx));
            match serde_json::from_value::<Transaction>(raw_transaction) {
                Ok(mut transaction) => {
                    if transaction.class_id.is_empty() {
                        transaction.class_id = wire.id.clone();
                    }
                    history.push(transaction);
                }
                Err(e) => ingested.flag(DataAnomaly::from_error(t_label, e.into())),
            }
        }

        ingested.push(BudgetClass {
            id: wire.id,
            name: wire.name,
            description: wire.description,
            class_type,
            keywords: wire.keywords,
            target,
            history,
        });
    }

    ingested
}

fn parse_target(raw: &Value) -> Result<Target, BudgetError> {
    let type_str = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| BudgetError::InvalidRecord("target has no \"type\" string".to_string()))?;
    let target_type = TargetType::parse(type_str).ok_or_else(|| {
        BudgetError::InvalidRecord(format!("unknown target type '{}'", type_str))
    })?;
    let value = raw
        .get("value")
        .and_then(Value::as_f64)
        .ok_or_else(|| BudgetError::InvalidRecord("target \"value\" is not a number".to_string()))?;

    Ok(Target { target_type, value })
}

pub fn ingest_reset_dates(raw: Vec<Value>) -> Ingested<i64> {
    let mut ingested = Ingested::default();
    for (idx, value) in raw.into_iter().enumerate() {
        match value.as_f64().filter(|v| v.is_finite()) {
            Some(seconds) => ingested.push(seconds.floor() as i64),
            None => ingested.flag(DataAnomaly::new(
                format!("reset #{}", idx),
                format!("{} is not a unix timestamp", value),
            )),
        }
    }
    ingested
}

pub fn ingest_savings(raw: Vec<Value>) -> Ingested<SavingsCategory> {
    let mut ingested = Ingested::default();
    for (idx, value) in raw.into_iter().enumerate() {
        let label = value
            .get("category")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("savings #{}", idx));
        match serde_json::from_value::<SavingsCategory>(value) {
            Ok(category) => {
                if !(0.0..=1.0).contains(&category.percent) {
                    warn!(
                        "Savings category '{}' has percent {} outside [0, 1]",
                        category.category, category.percent
                    );
                }
                ingested.push(category);
            }
            Err(e) => ingested.flag(DataAnomaly::from_error(label, e.into())),
        }
    }
    ingested
}

fn record_label(value: &Value, idx: usize) -> String {
    value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_type_skips_only_that_class() {
        let ingested = ingest_classes(vec![
            json!({"id": "c1", "name": "Rent", "history": []}),
            json!({"id": "c2", "name": "Salary", "type": "income", "history": [
                {"id": "t1", "price": 2000.0, "timestamp": 1_700_000_000}
            ]}),
        ]);

        assert_eq!(ingested.records.len(), 1);
        assert_eq!(ingested.records[0].id, "c2");
        assert_eq!(ingested.records[0].history[0].class_id, "c2");
        assert_eq!(ingested.anomalies.len(), 1);
        assert_eq!(ingested.anomalies[0].record, "c1");
    }

    #[test]
    fn test_unknown_type_kept_and_flagged() {
        let ingested = ingest_classes(vec![json!({
            "id": "c3", "name": "Mystery", "type": "transfer", "history": []
        })]);

        assert_eq!(ingested.records.len(), 1);
        assert_eq!(
            ingested.records[0].class_type,
            ClassType::Other("transfer".to_string())
        );
        assert_eq!(ingested.anomalies.len(), 1);
    }

    #[test]
    fn test_bad_target_dropped_class_kept() {
        let ingested = ingest_classes(vec![json!({
            "id": "c1", "name": "Food", "type": "e",
            "target": {"type": "dollar", "value": "lots"},
            "history": [{"id": "t1", "price": 20.0, "timestamp": 1_700_000_000}]
        })]);

        assert_eq!(ingested.records.len(), 1);
        assert!(ingested.records[0].target.is_none());
        assert_eq!(ingested.records[0].sum(), 20.0);
        assert_eq!(ingested.anomalies[0].record, "c1.target");
    }

    #[test]
    fn test_target_type_case_insensitive() {
        let ingested = ingest_classes(vec![json!({
            "id": "c1", "name": "Food", "type": "expense",
            "target": {"type": "Percent_Income", "value": 0.25}
        })]);
        assert_eq!(
            ingested.records[0].target,
            Some(Target::percent_of_income(0.25))
        );
    }

    #[test]
    fn test_bad_transaction_dropped() {
        let ingested = ingest_classes(vec![json!({
            "id": "c1", "name": "Food", "type": "expense",
            "history": [
                {"id": "t1", "price": 20.0, "timestamp": 1_700_000_000},
                {"id": "t2", "price": "free", "timestamp": 1_700_000_000}
            ]
        })]);

        assert_eq!(ingested.records[0].history.len(), 1);
        assert_eq!(ingested.anomalies.len(), 1);
        assert_eq!(ingested.anomalies[0].record, "c1/t2");
    }

    #[test]
    fn test_non_string_type_skips_class() {
        let ingested = ingest_classes(vec![json!({
            "id": "c5", "name": "Numeric", "type": 5, "history": []
        })]);

        assert!(ingested.records.is_empty());
        assert_eq!(ingested.anomalies.len(), 1);
        assert_eq!(ingested.anomalies[0].record, "c5");
    }

    #[test]
    fn test_out_of_range_savings_percent_kept() {
        let savings = ingest_savings(vec![json!({"category": "X", "percent": 1.5})]);
        assert_eq!(savings.records.len(), 1);
        assert_eq!(savings.records[0].percent, 1.5);
        assert!(savings.anomalies.is_empty());
    }

    #[test]
    fn test_reset_dates_and_savings() {
        let resets = ingest_reset_dates(vec![json!(1_700_000_000.9), json!("soon")]);
        assert_eq!(resets.records, vec![1_700_000_000]);
        assert_eq!(resets.anomalies.len(), 1);

        let savings = ingest_savings(vec![
            json!({"category": "Emergency", "percent": 0.2}),
            json!({"category": "Broken"}),
        ]);
        assert_eq!(savings.records.len(), 1);
        assert_eq!(savings.anomalies[0].record, "Broken");
    }
}
