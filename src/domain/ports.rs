use super::carrier::{CarrierStatus, ShippingPlan};
use super::discount::DiscountRuleDefinition;
use super::transaction::{DateRange, ProcessedTransaction, TransactionFilter};
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

#[async_trait]
pub trait CarrierRepository: Send + Sync {
    /// `None` when no such carrier exists.
    async fn is_enabled(&self, carrier: &str) -> Result<Option<bool>>;
    /// Plans of enabled carriers only.
    async fn shipping_plans(&self) -> Result<Vec<ShippingPlan>>;
    /// Returns the number of carriers affected.
    async fn set_enabled(&self, carrier: &str, enabled: bool) -> Result<usize>;
    async fn enable_statuses(&self) -> Result<Vec<CarrierStatus>>;
}

#[async_trait]
pub trait DiscountRuleRepository: Send + Sync {
    async fn active_rules(&self) -> Result<Vec<DiscountRuleDefinition>>;
}

/// Read-only aggregates over persisted transactions.
#[async_trait]
pub trait TransactionHistory: Send + Sync {
    async fn count(&self, range: DateRange, filter: &TransactionFilter) -> Result<u64>;
    async fn discount_sum(&self, range: DateRange, filter: &TransactionFilter) -> Result<Decimal>;
}

#[async_trait]
pub trait TransactionRepository: TransactionHistory {
    async fn save(&self, transaction: ProcessedTransaction) -> Result<()>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The lease expired or was taken over by someone else.
    #[error("lock is not owned")]
    NotOwned,
    #[error("lock unavailable: {0}")]
    Unavailable(String),
}

impl From<LockError> for ShippingError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::NotOwned => ShippingError::LockNotOwned,
            LockError::Unavailable(reason) => ShippingError::Lock(reason),
        }
    }
}

#[async_trait]
pub trait Lock: Send + Sync {
    async fn acquire(&self) -> std::result::Result<(), LockError>;
    async fn release(&self) -> std::result::Result<(), LockError>;
    /// Extends the lease of a lock that is already held.
    async fn reacquire(&self) -> std::result::Result<(), LockError>;
}

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<()>;
    async fn commit(&self) -> Result<()>;
    async fn abort(&self) -> Result<()>;
}

pub type CarrierRepositoryRef = Arc<dyn CarrierRepository>;
pub type DiscountRuleRepositoryRef = Arc<dyn DiscountRuleRepository>;
pub type TransactionRepositoryRef = Arc<dyn TransactionRepository>;
pub type LockRef = Arc<dyn Lock>;
pub type UnitOfWorkRef = Arc<dyn UnitOfWork>;
