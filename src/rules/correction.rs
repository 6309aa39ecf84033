use super::{CorrectionRule, RuleContext, RuleRegistry};
use crate::domain::transaction::{DateRange, TransactionFilter};
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

pub const MONTHLY_LIMITER: &str = "monthly-limiter";

pub(crate) fn register(registry: &mut RuleRegistry) -> Result<()> {
    registry.register_correction(MONTHLY_LIMITER, |params| {
        let config: MonthlyLimiterParams = params.parse(MONTHLY_LIMITER)?;
        Ok(Box::new(MonthlyLimiter::new(config.cap, config.filter)?))
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MonthlyLimiterParams {
    #[serde(alias = "size")]
    cap: Decimal,
    #[serde(default)]
    filter: TransactionFilter,
}

/// Keeps the discounts granted in one calendar month under `cap`.
///
/// A discount that would push the month's total over the cap is reduced to
/// whatever room is left, down to zero.
#[derive(Debug, Clone)]
pub struct MonthlyLimiter {
    cap: Decimal,
    filter: TransactionFilter,
}

impl MonthlyLimiter {
    /// Fails with a configuration error unless `cap` is positive.
    pub fn new(cap: Decimal, filter: TransactionFilter) -> Result<Self> {
        if cap <= Decimal::ZERO {
            return Err(ShippingError::Configuration(format!(
                "rule '{MONTHLY_LIMITER}' needs a positive cap, got {cap}"
            )));
        }
        Ok(Self { cap, filter })
    }
}

#[async_trait]
impl CorrectionRule for MonthlyLimiter {
    async fn correct(&self, discount: Decimal, context: &RuleContext<'_>) -> Result<Decimal> {
        let month = DateRange::calendar_month(context.transaction.date);
        let accumulated = context.history.discount_sum(month, &self.filter).await?;
        if discount + accumulated <= self.cap {
            return Ok(discount);
        }
        Ok((self.cap - accumulated).max(Decimal::ZERO))
    }
}
