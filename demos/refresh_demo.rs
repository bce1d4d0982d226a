use serde_json::{json, Value};
use snowbudget_client::*;

/// Serves a fixed budget from memory.
struct StaticBackend {
    classes: Value,
    resets: Value,
    savings: Value,
}

impl Backend for StaticBackend {
    async fn request(&self, endpoint: &str, method: Method, _payload: Option<&Value>) -> Result<Value> {
        println!("  -> {} {}", method, endpoint);
        let payload = match endpoint {
            "/get/all" => &self.classes,
            "/get/resets" => &self.resets,
            "/get/savings" => &self.savings,
            other => return Err(BudgetError::Transport(format!("unknown endpoint {}", other))),
        };
        Ok(json!({"success": true, "message": "", "payload": payload}))
    }
}

fn print_section(page: &PageController<StaticBackend>, title: &str, id: NodeId) {
    println!("\n== {} ==", title);
    for line in page.tree().text_lines(id) {
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let now = chrono::Utc::now().timestamp();
    let day = 24 * 3600;

    let backend = StaticBackend {
        classes: json!([
            {
                "id": "c-food", "name": "Food", "description": "Groceries and eating out",
                "type": "expense", "target": {"type": "percent_income", "value": 0.15},
                "history": [
                    {"id": "t1", "price": 82.40, "vendor": "Market", "description": "weekly shop", "timestamp": now - 9 * day},
                    {"id": "t2", "price": 23.10, "vendor": "Cafe", "description": "lunch", "timestamp": now - 4 * day},
                    {"id": "t3", "price": 64.95, "vendor": "Market", "description": "weekly shop", "timestamp": now - 2 * day}
                ]
            },
            {
                "id": "c-rent", "name": "rent", "type": "expense",
                "target": {"type": "dollar", "value": 1200.0},
                "history": [
                    {"id": "t4", "price": 1200.0, "vendor": "Landlord", "description": "", "timestamp": now - 12 * day, "recurring": true}
                ]
            },
            {
                "id": "c-pay", "name": "Paycheck", "type": "income",
                "history": [
                    {"id": "t5", "price": 1850.0, "vendor": "Employer", "description": "", "timestamp": now - 14 * day, "recurring": true}
                ]
            }
        ]),
        resets: json!([now + 16 * day, now + 46 * day]),
        savings: json!([
            {"category": "Emergency fund", "percent": 0.6},
            {"category": "Travel", "percent": 0.4}
        ]),
    };

    let config = ClientConfig::from_json_str(r#"{"refresh_policy": "live"}"#)?;
    let mut page = PageController::new(backend, config)?;

    println!("Refreshing...");
    let outcome = page.refresh(now).await?;

    print_section(&page, "Summary", page.layout().summary);
    print_section(&page, "Savings", page.layout().savings);
    print_section(&page, "Expenses", page.layout().expenses);
    print_section(&page, "Income", page.layout().income);

    if let Some(series) = outcome.series.get("c-food") {
        println!(
            "\nFood chart: {} days, ends at {}",
            series.len(),
            format_currency(series.cumulative_totals.last().copied().unwrap_or(0.0))
        );
    }

    let again = page.refresh(now).await?;
    println!(
        "\nSecond refresh: {} classes built, {} patched, {} nodes created",
        again.report.classes_built, again.report.classes_patched, again.report.nodes_created
    );

    println!("\nBudget class schema:\n{}", BudgetClass::schema_as_json()?);
    Ok(())
}
