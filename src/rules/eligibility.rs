use super::{EligibilityRule, RuleContext, RuleRegistry};
use crate::domain::discount::DiscountId;
use crate::domain::transaction::{DateRange, TransactionAttributes, TransactionFilter};
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use serde::Deserialize;

pub const ATTRIBUTES_EQUAL: &str = "attributes-equal";
pub const MAX_N_PER_MONTH: &str = "max-n-per-month";
pub const EVERY_NTH_TRANSACTION: &str = "every-nth-transaction";

pub(crate) fn register(registry: &mut RuleRegistry) -> Result<()> {
    registry.register_eligibility(ATTRIBUTES_EQUAL, |params| {
        Ok(Box::new(AttributesEqual::new(params.parse(ATTRIBUTES_EQUAL)?)?))
    })?;
    registry.register_eligibility(MAX_N_PER_MONTH, |params| {
        let config: MaxNPerMonthParams = params.parse(MAX_N_PER_MONTH)?;
        let discount_id = config.discount_id.unwrap_or(params.discount_id);
        Ok(Box::new(MaxNPerMonth::new(discount_id, config.n)?))
    })?;
    registry.register_eligibility(EVERY_NTH_TRANSACTION, |params| {
        let config: EveryNthParams = params.parse(EVERY_NTH_TRANSACTION)?;
        Ok(Box::new(EveryNthTransaction::new(config.nth, config.filter)?))
    })
}

/// Eligible when every configured field equals the transaction's.
#[derive(Debug, Clone)]
pub struct AttributesEqual {
    expected: TransactionAttributes,
}

impl AttributesEqual {
    pub fn new(expected: TransactionAttributes) -> Result<Self> {
        if expected.is_empty() {
            return Err(ShippingError::Configuration(format!(
                "rule '{ATTRIBUTES_EQUAL}' needs at least one attribute to compare"
            )));
        }
        Ok(Self { expected })
    }
}

#[async_trait]
impl EligibilityRule for AttributesEqual {
    async fn eligible(&self, context: &RuleContext<'_>) -> Result<bool> {
        Ok(self.expected.matches(context.transaction))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaxNPerMonthParams {
    n: u64,
    #[serde(default)]
    discount_id: Option<DiscountId>,
}

/// Eligible while the discount was applied fewer than `n` times in the
/// transaction's calendar month.
#[derive(Debug, Clone)]
pub struct MaxNPerMonth {
    discount_id: DiscountId,
    n: u64,
}

impl MaxNPerMonth {
    /// `discount_id` names the discount whose applications are counted.
    pub fn new(discount_id: DiscountId, n: u64) -> Result<Self> {
        if n < 1 {
            return Err(ShippingError::Configuration(format!(
                "rule '{MAX_N_PER_MONTH}' needs n >= 1"
            )));
        }
        Ok(Self { discount_id, n })
    }
}

#[async_trait]
impl EligibilityRule for MaxNPerMonth {
    async fn eligible(&self, context: &RuleContext<'_>) -> Result<bool> {
        let month = DateRange::calendar_month(context.transaction.date);
        let applied = context
            .history
            .count(month, &TransactionFilter::discount(self.discount_id))
            .await?;
        Ok(applied < self.n)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EveryNthParams {
    nth: u64,
    #[serde(default)]
    filter: TransactionAttributes,
}

/// Eligible for every `nth` transaction matching the filter, counting the
/// one being processed.
#[derive(Debug, Clone)]
pub struct EveryNthTransaction {
    nth: u64,
    filter: TransactionAttributes,
}

impl EveryNthTransaction {
    /// Fails with a configuration error when `nth` is zero.
    pub fn new(nth: u64, filter: TransactionAttributes) -> Result<Self> {
        if nth < 1 {
            return Err(ShippingError::Configuration(format!(
                "rule '{EVERY_NTH_TRANSACTION}' needs nth >= 1"
            )));
        }
        Ok(Self { nth, filter })
    }
}

#[async_trait]
impl EligibilityRule for EveryNthTransaction {
    async fn eligible(&self, context: &RuleContext<'_>) -> Result<bool> {
        if !self.filter.matches(context.transaction) {
            return Ok(false);
        }
        let persisted = context
            .history
            .count(DateRange::ALL, &TransactionFilter::from(self.filter.clone()))
            .await?;
        // The current transaction is not persisted yet.
        Ok((persisted + 1) % self.nth == 0)
    }
}
