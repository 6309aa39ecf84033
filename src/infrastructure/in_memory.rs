use crate::domain::carrier::{CarrierStatus, ShippingPlan, normalize_code};
use crate::domain::discount::DiscountRuleDefinition;
use crate::domain::ports::{
    CarrierRepository, DiscountRuleRepository, TransactionHistory, TransactionRepository, UnitOfWork,
};
use crate::domain::transaction::{DateRange, ProcessedTransaction, TransactionFilter};
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory carrier catalogue.
///
/// Holds every shipping plan ever configured; only plans of enabled carriers
/// are handed out.
#[derive(Default, Clone)]
pub struct InMemoryCarrierRepository {
    shipping_plans: Arc<Vec<ShippingPlan>>,
    statuses: Arc<RwLock<Vec<CarrierStatus>>>,
}

impl InMemoryCarrierRepository {
    /// Creates a store seeded with the given plans and carrier statuses.
    pub fn new(shipping_plans: Vec<ShippingPlan>, statuses: Vec<CarrierStatus>) -> Self {
        Self {
            shipping_plans: Arc::new(shipping_plans),
            statuses: Arc::new(RwLock::new(statuses)),
        }
    }
}

#[async_trait]
impl CarrierRepository for InMemoryCarrierRepository {
    async fn is_enabled(&self, carrier: &str) -> Result<Option<bool>> {
        let statuses = self.statuses.read().await;
        Ok(statuses
            .iter()
            .find(|status| status.carrier == carrier)
            .map(|status| status.enabled))
    }

    async fn shipping_plans(&self) -> Result<Vec<ShippingPlan>> {
        let statuses = self.statuses.read().await;
        Ok(self
            .shipping_plans
            .iter()
            .filter(|plan| {
                statuses
                    .iter()
                    .any(|status| status.enabled && status.carrier == plan.carrier)
            })
            .cloned()
            .collect())
    }

    async fn set_enabled(&self, carrier: &str, enabled: bool) -> Result<usize> {
        let carrier = normalize_code(carrier);
        let mut statuses = self.statuses.write().await;
        let mut affected = 0;
        for status in statuses.iter_mut().filter(|status| status.carrier == carrier) {
            status.enabled = enabled;
            affected += 1;
        }
        Ok(affected)
    }

    async fn enable_statuses(&self) -> Result<Vec<CarrierStatus>> {
        Ok(self.statuses.read().await.clone())
    }
}

/// Discount rules fixed at construction time.
#[derive(Default, Clone)]
pub struct StaticDiscountRuleRepository {
    rules: Arc<Vec<DiscountRuleDefinition>>,
}

impl StaticDiscountRuleRepository {
    /// Serves `rules` unchanged for every request.
    pub fn new(rules: Vec<DiscountRuleDefinition>) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }
}

#[async_trait]
impl DiscountRuleRepository for StaticDiscountRuleRepository {
    async fn active_rules(&self) -> Result<Vec<DiscountRuleDefinition>> {
        Ok(self.rules.as_ref().clone())
    }
}

#[derive(Default)]
struct Ledger {
    committed: Vec<ProcessedTransaction>,
    /// Writes of the open unit of work, if one is open.
    staged: Option<Vec<ProcessedTransaction>>,
}

impl Ledger {
    fn visible(&self) -> impl Iterator<Item = &ProcessedTransaction> {
        self.committed.iter().chain(self.staged.iter().flatten())
    }
}

/// A thread-safe in-memory transaction store that is also its own unit of
/// work.
///
/// Outside a unit of work, `save` writes straight through. Between `begin`
/// and `commit` writes are staged: they are visible to reads but only become
/// durable on `commit`, and `abort` discards them.
#[derive(Default, Clone)]
pub struct InMemoryTransactionRepository {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryTransactionRepository {
    /// Creates a new, empty transaction store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed transactions, in save order.
    pub async fn committed(&self) -> Vec<ProcessedTransaction> {
        self.ledger.read().await.committed.clone()
    }
}

#[async_trait]
impl TransactionHistory for InMemoryTransactionRepository {
    async fn count(&self, range: DateRange, filter: &TransactionFilter) -> Result<u64> {
        let ledger = self.ledger.read().await;
        let count = ledger
            .visible()
            .filter(|tx| range.contains(tx.transaction.date) && filter.matches(tx))
            .count();
        Ok(count as u64)
    }

    async fn discount_sum(&self, range: DateRange, filter: &TransactionFilter) -> Result<Decimal> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .visible()
            .filter(|tx| range.contains(tx.transaction.date) && filter.matches(tx))
            .filter_map(|tx| tx.discount)
            .map(|discount| discount.value())
            .sum())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn save(&self, transaction: ProcessedTransaction) -> Result<()> {
        let mut guard = self.ledger.write().await;
        let ledger = &mut *guard;
        match &mut ledger.staged {
            Some(staged) => staged.push(transaction),
            None => ledger.committed.push(transaction),
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryTransactionRepository {
    async fn begin(&self) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        if ledger.staged.is_some() {
            return Err(ShippingError::UnitOfWork(
                "a unit of work is already open".to_string(),
            ));
        }
        ledger.staged = Some(Vec::new());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        let staged = ledger
            .staged
            .take()
            .ok_or_else(|| ShippingError::UnitOfWork("no unit of work to commit".to_string()))?;
        ledger.committed.extend(staged);
        Ok(())
    }

    async fn abort(&self) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        match ledger.staged.take() {
            Some(discarded) => {
                tracing::debug!(discarded = discarded.len(), "unit of work aborted");
                Ok(())
            }
            None => Err(ShippingError::UnitOfWork("no unit of work to abort".to_string())),
        }
    }
}
