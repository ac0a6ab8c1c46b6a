//! Ledger snapshot: participants and the expense log.
//!
//! Pure domain logic only. Every mutation yields a new snapshot (or events
//! appended to the operation log); nothing is mutated in place.

pub mod expense;
pub mod query;
pub mod service;
pub mod snapshot;

pub use expense::{Expense, NewExpense};
pub use query::ExpenseQuery;
pub use service::{LedgerService, ServiceError};
pub use snapshot::{
    AddExpense, AddParticipant, ExpenseAdded, ExpenseRemoved, ExpensesReplaced, LedgerCommand,
    LedgerEvent, LedgerSnapshot, ParticipantAdded, ParticipantRemoved, RemoveExpense,
    RemoveParticipant, ReplaceExpenses,
};
