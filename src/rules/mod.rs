//! Discount rule engine.
//!
//! A discount rule is assembled from three kinds of sub-rules, each an async
//! trait with a single required method:
//!
//! * [`EligibilityRule`] decides whether the discount applies at all,
//! * [`SizeRule`] computes the raw discount,
//! * [`CorrectionRule`] adjusts the raw discount, typically to enforce a cap.
//!
//! Every method receives the same [`RuleContext`]; a rule reads only the
//! fields it needs. Variants are looked up by name in a [`RuleRegistry`] and
//! bound together by a [`DiscountRuleExecutor`].

pub mod correction;
pub mod eligibility;
pub mod executor;
pub mod registry;
pub mod size;

pub use executor::DiscountRuleExecutor;
pub use registry::{RuleKind, RuleRegistry};

use crate::domain::carrier::ShippingPlan;
use crate::domain::discount::DiscountId;
use crate::domain::ports::TransactionHistory;
use crate::domain::transaction::UnprocessedTransaction;
use crate::error::{Result, ShippingError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;

/// Everything a rule may look at while evaluating one transaction.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub transaction: &'a UnprocessedTransaction,
    /// Base price before any discount.
    pub price: Decimal,
    pub shipping_plans: &'a [ShippingPlan],
    pub history: &'a dyn TransactionHistory,
}

#[async_trait]
pub trait EligibilityRule: Send + Sync + Debug {
    async fn eligible(&self, context: &RuleContext<'_>) -> Result<bool>;
}

#[async_trait]
pub trait SizeRule: Send + Sync + Debug {
    async fn compute_discount(&self, context: &RuleContext<'_>) -> Result<Decimal>;
}

#[async_trait]
pub trait CorrectionRule: Send + Sync + Debug {
    async fn correct(&self, discount: Decimal, context: &RuleContext<'_>) -> Result<Decimal>;
}

/// Parameters handed to a rule constructor.
#[derive(Debug, Clone, Copy)]
pub struct RuleParams<'a> {
    /// Discount the rule is being bound into.
    pub discount_id: DiscountId,
    pub values: &'a Value,
}

impl RuleParams<'_> {
    /// Deserializes the raw values into a variant's typed parameters.
    pub fn parse<T: DeserializeOwned>(&self, rule: &str) -> Result<T> {
        serde_json::from_value(self.values.clone()).map_err(|e| {
            ShippingError::Configuration(format!("invalid params for rule '{rule}': {e}"))
        })
    }
}
