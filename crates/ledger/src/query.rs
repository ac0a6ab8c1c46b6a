use serde::{Deserialize, Serialize};

use tripsplit_core::ExpenseId;

use crate::expense::Expense;

/// Expense lookup.
///
/// Name matches are case-insensitive substring matches. Results are ordered
/// newest first by expense date; equal dates keep log order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ExpenseQuery {
    Id(ExpenseId),
    Payer(String),
    Participant(String),
}

impl ExpenseQuery {
    pub fn matches(&self, expense: &Expense) -> bool {
        match self {
            ExpenseQuery::Id(id) => expense.id() == id,
            ExpenseQuery::Payer(needle) => contains_ignore_case(expense.payer().name(), needle),
            ExpenseQuery::Participant(needle) => expense
                .shared_by()
                .iter()
                .any(|p| contains_ignore_case(p.name(), needle)),
        }
    }

    pub fn run<'a>(&self, expenses: &'a [Expense]) -> Vec<&'a Expense> {
        let mut found: Vec<&Expense> = expenses.iter().filter(|e| self.matches(e)).collect();
        found.sort_by(|a, b| b.date().cmp(&a.date()));
        found
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}
