//! `tripsplit-core`: shared building blocks for the settlement engine.
//!
//! This crate contains **pure domain** primitives (no IO, no logging setup).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;
pub mod participant;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{ExpenseId, LedgerId};
pub use money::Money;
pub use participant::{Participant, ParticipantSet};
