use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tripsplit_core::{DomainError, DomainResult, ExpenseId, Money, Participant};

/// One shared expense.
///
/// Built through [`NewExpense::validate`] for local input. Imported records
/// go through [`Expense::from_import`], which skips validation: the balance
/// calculator tolerates malformed imported data instead of rejecting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    id: ExpenseId,
    description: String,
    amount: Money,
    payer: Participant,
    shared_by: Vec<Participant>,
    date: DateTime<Utc>,
}

impl Expense {
    /// Construct without validation (externally-sourced data).
    pub fn from_import(
        id: ExpenseId,
        description: String,
        amount: Money,
        payer: Participant,
        shared_by: Vec<Participant>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            description,
            amount,
            payer,
            shared_by,
            date,
        }
    }

    pub fn id(&self) -> &ExpenseId {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn payer(&self) -> &Participant {
        &self.payer
    }

    pub fn shared_by(&self) -> &[Participant] {
        &self.shared_by
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Whether `participant` pays or shares this expense.
    pub fn involves(&self, participant: &Participant) -> bool {
        &self.payer == participant || self.shared_by.contains(participant)
    }

    /// Payer first, then sharers, in order.
    pub fn referenced(&self) -> impl Iterator<Item = &Participant> {
        core::iter::once(&self.payer).chain(self.shared_by.iter())
    }
}

/// Caller input for a new expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub id: ExpenseId,
    pub description: String,
    pub amount: Money,
    pub payer: String,
    pub shared_by: Vec<String>,
    pub date: DateTime<Utc>,
}

impl NewExpense {
    /// Input with a freshly generated id.
    pub fn new(
        description: impl Into<String>,
        amount: Money,
        payer: impl Into<String>,
        shared_by: impl IntoIterator<Item = impl Into<String>>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ExpenseId::generate(),
            description: description.into(),
            amount,
            payer: payer.into(),
            shared_by: shared_by.into_iter().map(Into::into).collect(),
            date,
        }
    }

    /// Validate into an [`Expense`].
    ///
    /// Repeated sharers are collapsed (first occurrence wins).
    pub fn validate(self) -> DomainResult<Expense> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }
        if !self.amount.is_positive() {
            return Err(DomainError::validation("amount must be positive"));
        }
        if !self.amount.is_within_limit() {
            return Err(DomainError::validation(format!(
                "amount exceeds the per-expense limit of {}",
                Money::MAX_AMOUNT
            )));
        }
        let payer = Participant::new(&self.payer)
            .map_err(|_| DomainError::validation("payer cannot be empty"))?;

        let mut shared_by: Vec<Participant> = Vec::with_capacity(self.shared_by.len());
        for name in &self.shared_by {
            let participant = Participant::new(name)
                .map_err(|_| DomainError::validation("shared_by contains an empty name"))?;
            if !shared_by.contains(&participant) {
                shared_by.push(participant);
            }
        }
        if shared_by.is_empty() {
            return Err(DomainError::validation(
                "expense must be shared by at least one participant",
            ));
        }

        Ok(Expense {
            id: self.id,
            description: description.to_string(),
            amount: self.amount,
            payer,
            shared_by,
            date: self.date,
        })
    }
}
