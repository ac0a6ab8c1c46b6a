//! Settlement module: net balances and the greedy payment plan.
//!
//! Both computations are pure functions of their inputs and keep no state
//! between calls; rerun them in full after every ledger change.

pub mod balance;
pub mod planner;

pub use balance::{BalanceEntry, Balances, compute_balances};
pub use planner::{SETTLED_EPSILON, SettlementPlan, Transaction, apply_transactions, plan_settlement};
