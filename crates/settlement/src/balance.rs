use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use tripsplit_core::{Money, Participant, ParticipantSet};
use tripsplit_ledger::{Expense, LedgerSnapshot};

/// One participant's net position. Positive: is owed money. Negative: owes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub participant: Participant,
    pub amount: Money,
}

/// Net balance per participant, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<BalanceEntry>", into = "Vec<BalanceEntry>")]
pub struct Balances {
    entries: Vec<BalanceEntry>,
    index: HashMap<Participant, usize>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every participant of the set at zero.
    pub fn zeroed(participants: &ParticipantSet) -> Self {
        participants
            .iter()
            .map(|p| (p.clone(), Money::ZERO))
            .collect()
    }

    fn slot(&mut self, participant: &Participant) -> &mut Money {
        let idx = match self.index.get(participant) {
            Some(idx) => *idx,
            None => {
                self.entries.push(BalanceEntry {
                    participant: participant.clone(),
                    amount: Money::ZERO,
                });
                let idx = self.entries.len() - 1;
                self.index.insert(participant.clone(), idx);
                idx
            }
        };
        &mut self.entries[idx].amount
    }

    /// Increase a balance, materializing the participant at zero if unknown.
    /// Saturates at the `i64` bounds.
    pub fn credit(&mut self, participant: &Participant, amount: Money) {
        let slot = self.slot(participant);
        *slot = slot.saturating_add(amount);
    }

    /// Decrease a balance, materializing the participant at zero if unknown.
    /// Saturates at the `i64` bounds.
    pub fn debit(&mut self, participant: &Participant, amount: Money) {
        let slot = self.slot(participant);
        *slot = slot.saturating_sub(amount);
    }

    pub fn get(&self, participant: &Participant) -> Option<Money> {
        self.index
            .get(participant)
            .map(|idx| self.entries[*idx].amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Participant, Money)> {
        self.entries.iter().map(|e| (&e.participant, e.amount))
    }

    pub fn entries(&self) -> &[BalanceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all balances; zero for any well-formed expense log.
    pub fn total(&self) -> Money {
        self.entries
            .iter()
            .fold(Money::ZERO, |acc, e| acc.saturating_add(e.amount))
    }

    pub fn is_zero_sum(&self) -> bool {
        self.total().is_zero()
    }

    /// Number of participants whose balance is not settled.
    pub fn unsettled_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.amount.is_zero()).count()
    }
}

impl From<Vec<BalanceEntry>> for Balances {
    fn from(value: Vec<BalanceEntry>) -> Self {
        value
            .into_iter()
            .map(|e| (e.participant, e.amount))
            .collect()
    }
}

impl From<Balances> for Vec<BalanceEntry> {
    fn from(value: Balances) -> Self {
        value.entries
    }
}

/// Collecting adds amounts of repeated participants together.
impl FromIterator<(Participant, Money)> for Balances {
    fn from_iter<I: IntoIterator<Item = (Participant, Money)>>(iter: I) -> Self {
        let mut balances = Balances::new();
        for (participant, amount) in iter {
            balances.credit(&participant, amount);
        }
        balances
    }
}

/// Fold an expense log into net balances.
///
/// Every participant of `participants` starts at zero. Each expense credits
/// the payer the full amount and debits each sharer an equal share; when the
/// amount does not divide evenly the leading sharers carry one extra cent, so
/// shares always sum to the amount. Payers and sharers missing from
/// `participants` are added at zero in first-seen order.
///
/// An expense with no sharers only credits its payer and leaves the result
/// non-zero-sum; rejecting such input is the caller's job.
pub fn compute_balances(participants: &ParticipantSet, expenses: &[Expense]) -> Balances {
    let mut balances = Balances::zeroed(participants);

    for expense in expenses {
        balances.credit(expense.payer(), expense.amount());

        if expense.shared_by().is_empty() {
            tracing::warn!(
                expense_id = %expense.id(),
                "expense has no sharers; crediting payer only"
            );
            continue;
        }

        let shares = expense.amount().split_even(expense.shared_by().len());
        for (participant, share) in expense.shared_by().iter().zip(shares) {
            balances.debit(participant, share);
        }
    }

    tracing::debug!(
        participants = balances.len(),
        expenses = expenses.len(),
        "balances recomputed"
    );

    balances
}

impl From<&LedgerSnapshot> for Balances {
    fn from(snapshot: &LedgerSnapshot) -> Self {
        compute_balances(snapshot.participants(), snapshot.expenses())
    }
}
