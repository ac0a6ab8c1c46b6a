//! Text and JSON rendering of command results.

use serde::Serialize;

use tripsplit_core::Money;
use tripsplit_ledger::Expense;
use tripsplit_settlement::{Balances, SETTLED_EPSILON, SettlementPlan, Transaction};

use crate::args::OutputFormat;

#[derive(Debug, Serialize)]
struct SettleReport<'a> {
    balances: &'a Balances,
    transactions: &'a [Transaction],
}

fn signed(amount: Money) -> String {
    if amount.is_positive() {
        format!("+{amount}")
    } else {
        amount.to_string()
    }
}

fn status(amount: Money) -> &'static str {
    if amount.abs() < SETTLED_EPSILON {
        "settled"
    } else if amount.is_positive() {
        "is owed"
    } else {
        "owes"
    }
}

fn balances_text(balances: &Balances) -> String {
    if balances.is_empty() {
        return "No participants.\n".to_string();
    }
    let width = balances
        .iter()
        .map(|(p, _)| p.name().chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (participant, amount) in balances.iter() {
        out.push_str(&format!(
            "{:<width$}  {:>12}  {}\n",
            participant.name(),
            signed(amount),
            status(amount),
        ));
    }
    out
}

fn transactions_text(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "Everyone is settled up.\n".to_string();
    }
    transactions.iter().map(|t| format!("{t}\n")).collect()
}

pub fn balances(balances: &Balances, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(balances_text(balances)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(balances)? + "\n"),
    }
}

pub fn settlement(
    balances: &Balances,
    plan: &SettlementPlan,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => {
            let mut out = balances_text(balances);
            out.push('\n');
            out.push_str(&transactions_text(plan.transactions()));
            if !plan.is_settled() {
                out.push_str(&format!(
                    "\nwarning: balances do not sum to zero ({} left over)\n",
                    plan.residual().total()
                ));
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let report = SettleReport {
                balances,
                transactions: plan.transactions(),
            };
            Ok(serde_json::to_string_pretty(&report)? + "\n")
        }
    }
}

pub fn expenses(found: &[&Expense], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => {
            if found.is_empty() {
                return Ok("No matching expenses.\n".to_string());
            }
            let mut out = String::new();
            for e in found {
                let sharers: Vec<&str> = e.shared_by().iter().map(|p| p.name()).collect();
                out.push_str(&format!(
                    "[{}] {}  {}  {} paid {} for {}\n",
                    e.id(),
                    e.date().format("%Y-%m-%d %H:%M"),
                    e.description(),
                    e.payer(),
                    e.amount(),
                    sharers.join(", "),
                ));
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(found)? + "\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripsplit_core::Participant;
    use tripsplit_settlement::plan_settlement;

    fn sample() -> Balances {
        [("Alice", 5000), ("Bo", -1000), ("Carol", -4000), ("Dan", 0)]
            .into_iter()
            .map(|(n, c)| (Participant::lenient(n), Money::from_cents(c)))
            .collect()
    }

    #[test]
    fn balances_are_aligned_and_signed() {
        let text = balances(&sample(), OutputFormat::Text).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Alice        +50.00  is owed");
        assert_eq!(lines[1], "Bo           -10.00  owes");
        assert_eq!(lines[3], "Dan            0.00  settled");
    }

    #[test]
    fn settlement_text_lists_payments_after_balances() {
        let balances = sample();
        let plan = plan_settlement(&balances);
        let text = settlement(&balances, &plan, OutputFormat::Text).unwrap();
        assert!(text.ends_with("Carol pays Alice 40.00\nBo pays Alice 10.00\n"));
        assert!(!text.contains("warning"));
    }

    #[test]
    fn settlement_json_has_balances_and_transactions() {
        let balances = sample();
        let plan = plan_settlement(&balances);
        let json = settlement(&balances, &plan, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["balances"][0]["participant"], "Alice");
        assert_eq!(value["balances"][0]["amount"], 5000);
        assert_eq!(value["transactions"][0]["from"], "Carol");
        assert_eq!(value["transactions"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn empty_inputs_render_placeholders() {
        assert_eq!(
            balances(&Balances::new(), OutputFormat::Text).unwrap(),
            "No participants.\n"
        );
        assert_eq!(
            expenses(&[], OutputFormat::Text).unwrap(),
            "No matching expenses.\n"
        );
    }
}
