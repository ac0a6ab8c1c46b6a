use serde::{Deserialize, Serialize};

use tripsplit_core::{Money, Participant};

use crate::balance::Balances;

/// Balances whose absolute value is below this are considered settled.
///
/// Amounts are integer cents, so this makes "settled" mean exactly zero.
pub const SETTLED_EPSILON: Money = Money::CENT;

/// One payment: `from` (debtor) pays `to` (creditor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Participant,
    pub to: Participant,
    pub amount: Money,
}

impl core::fmt::Display for Transaction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} pays {} {}", self.from, self.to, self.amount)
    }
}

/// Output of [`plan_settlement`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    transactions: Vec<Transaction>,
    /// Balances after applying every transaction. All zero unless the input
    /// was not zero-sum.
    residual: Balances,
}

impl SettlementPlan {
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    pub fn residual(&self) -> &Balances {
        &self.residual
    }

    pub fn is_settled(&self) -> bool {
        self.residual.iter().all(|(_, amount)| amount.abs() < SETTLED_EPSILON)
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }
}

struct Position {
    participant: Participant,
    amount: Money,
}

/// Greedy largest-debtor / largest-creditor matching.
///
/// Debtors are taken most-negative first and creditors most-positive first;
/// both sorts are stable, so ties follow the balance order (first-seen order).
/// Each step moves `min(|debt|, credit)` and retires whichever side reached
/// zero. Produces at most `n - 1` transactions for `n` unsettled participants.
/// A balance of a single cent counts as unsettled and is paid like any other.
/// This is not guaranteed to be the global minimum.
pub fn plan_settlement(balances: &Balances) -> SettlementPlan {
    if !balances.is_zero_sum() {
        tracing::warn!(
            total = %balances.total(),
            "balances are not zero-sum; plan will leave a residual"
        );
    }

    let mut debtors: Vec<Position> = Vec::new();
    let mut creditors: Vec<Position> = Vec::new();
    for (participant, amount) in balances.iter() {
        let position = Position {
            participant: participant.clone(),
            amount,
        };
        if amount <= -SETTLED_EPSILON {
            debtors.push(position);
        } else if amount >= SETTLED_EPSILON {
            creditors.push(position);
        }
    }

    debtors.sort_by(|a, b| a.amount.cmp(&b.amount));
    creditors.sort_by(|a, b| b.amount.cmp(&a.amount));

    let mut transactions = Vec::with_capacity(debtors.len() + creditors.len());
    let (mut d, mut c) = (0, 0);

    while d < debtors.len() && c < creditors.len() {
        let debtor = &mut debtors[d];
        let creditor = &mut creditors[c];

        let amount = debtor.amount.abs().min(creditor.amount);
        transactions.push(Transaction {
            from: debtor.participant.clone(),
            to: creditor.participant.clone(),
            amount,
        });

        debtor.amount += amount;
        creditor.amount -= amount;

        if debtor.amount.abs() < SETTLED_EPSILON {
            d += 1;
        }
        if creditor.amount < SETTLED_EPSILON {
            c += 1;
        }
    }

    tracing::debug!(
        debtors = debtors.len(),
        creditors = creditors.len(),
        transactions = transactions.len(),
        "settlement planned"
    );

    let residual = apply_transactions(balances, &transactions);
    SettlementPlan {
        transactions,
        residual,
    }
}

/// Apply payments to balances: the payer's balance rises, the payee's falls.
pub fn apply_transactions(balances: &Balances, transactions: &[Transaction]) -> Balances {
    let mut next = balances.clone();
    for t in transactions {
        next.credit(&t.from, t.amount);
        next.debit(&t.to, t.amount);
    }
    next
}
