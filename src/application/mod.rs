//! Application layer orchestrating the domain.
//!
//! [`processor::TransactionProcessor`] is the entry point for pricing a
//! shipping transaction: it validates the request, evaluates every active
//! discount rule under the shared lock and persists the outcome.
//! [`carrier::CarrierService`] toggles carriers on and off.

pub mod carrier;
pub mod dto;
pub mod processor;
