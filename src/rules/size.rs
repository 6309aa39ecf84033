use super::{RuleContext, RuleRegistry, SizeRule};
use crate::domain::carrier::deserialize_optional_code;
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

pub const FULL_PRICE: &str = "full-price";
pub const MATCH_TO_LOWEST_PLAN: &str = "match-to-lowest-plan";

pub(crate) fn register(registry: &mut RuleRegistry) -> Result<()> {
    registry.register_size(FULL_PRICE, |_| Ok(Box::new(FullPrice)))?;
    registry.register_size(MATCH_TO_LOWEST_PLAN, |params| {
        Ok(Box::new(MatchToLowestPlan::new(
            params.parse(MATCH_TO_LOWEST_PLAN)?,
        )))
    })
}

/// Discounts the whole base price.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullPrice;

#[async_trait]
impl SizeRule for FullPrice {
    async fn compute_discount(&self, context: &RuleContext<'_>) -> Result<Decimal> {
        Ok(context.price)
    }
}

/// Which shipping plans take part in the comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFilter {
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    pub carrier: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    pub package_size: Option<String>,
}

/// Brings the price down to the cheapest matching plan.
#[derive(Debug, Clone)]
pub struct MatchToLowestPlan {
    filter: PlanFilter,
}

impl MatchToLowestPlan {
    pub fn new(filter: PlanFilter) -> Self {
        Self { filter }
    }
}

#[async_trait]
impl SizeRule for MatchToLowestPlan {
    async fn compute_discount(&self, context: &RuleContext<'_>) -> Result<Decimal> {
        let lowest = context
            .shipping_plans
            .iter()
            .filter(|plan| {
                self.filter
                    .carrier
                    .as_ref()
                    .is_none_or(|carrier| *carrier == plan.carrier)
                    && self
                        .filter
                        .package_size
                        .as_ref()
                        .is_none_or(|size| *size == plan.package_size)
            })
            .map(|plan| plan.price.value())
            .min()
            .ok_or_else(|| {
                ShippingError::RuleEvaluation(format!(
                    "no shipping plan matches {:?} to compare the price against",
                    self.filter
                ))
            })?;
        Ok(context.price - lowest)
    }
}
