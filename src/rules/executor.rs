use super::{CorrectionRule, EligibilityRule, RuleContext, RuleRegistry, SizeRule};
use crate::domain::discount::{DiscountId, DiscountRuleDefinition};
use crate::error::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use rust_decimal::Decimal;

/// One discount rule with its sub-rules bound and ready to evaluate.
///
/// Built fresh from the active definitions for every processed transaction.
/// The bound rules are never mutated after construction.
#[derive(Debug)]
pub struct DiscountRuleExecutor {
    discount_id: DiscountId,
    size_rule: Box<dyn SizeRule>,
    eligibility_rules: Vec<Box<dyn EligibilityRule>>,
    correction_rule: Option<Box<dyn CorrectionRule>>,
}

impl DiscountRuleExecutor {
    /// Binds resolved rules into one discount.
    ///
    /// # Arguments
    ///
    /// * `discount_id` - The discount the computed amount is recorded under.
    /// * `size_rule` - Computes the raw discount from the price.
    /// * `eligibility_rules` - All must pass for the discount to apply.
    /// * `correction_rule` - Optionally adjusts the raw discount.
    pub fn new(
        discount_id: DiscountId,
        size_rule: Box<dyn SizeRule>,
        eligibility_rules: Vec<Box<dyn EligibilityRule>>,
        correction_rule: Option<Box<dyn CorrectionRule>>,
    ) -> Self {
        Self {
            discount_id,
            size_rule,
            eligibility_rules,
            correction_rule,
        }
    }

    /// Resolves every sub-rule of `definition` through `registry`.
    pub fn from_definition(definition: &DiscountRuleDefinition, registry: &RuleRegistry) -> Result<Self> {
        let discount_id = definition.discount_id;
        let size_rule = registry.resolve_size(&definition.size_rule, discount_id)?;
        let eligibility_rules = definition
            .eligibility_rules
            .iter()
            .map(|spec| registry.resolve_eligibility(spec, discount_id))
            .collect::<Result<Vec<_>>>()?;
        let correction_rule = definition
            .correction_rule
            .as_ref()
            .map(|spec| registry.resolve_correction(spec, discount_id))
            .transpose()?;

        tracing::debug!(
            discount_id,
            size_rule = %definition.size_rule.name,
            eligibility_rules = eligibility_rules.len(),
            corrected = correction_rule.is_some(),
            "bound discount rule"
        );
        Ok(Self::new(discount_id, size_rule, eligibility_rules, correction_rule))
    }

    pub fn discount_id(&self) -> DiscountId {
        self.discount_id
    }

    /// Evaluates the rule against one transaction.
    ///
    /// Returns `Ok(None)` when the transaction is not eligible or the rule
    /// yields nothing positive. Negative amounts from the size or correction
    /// rule are logged and treated as no discount.
    pub async fn evaluate(&self, context: &RuleContext<'_>) -> Result<Option<Decimal>> {
        if !self.is_eligible(context).await? {
            return Ok(None);
        }

        let raw = self.size_rule.compute_discount(context).await?;
        if raw < Decimal::ZERO {
            tracing::error!(
                discount_id = self.discount_id,
                discount = %raw,
                "size rule returned a negative discount, no discount is applicable"
            );
            return Ok(None);
        }
        if raw.is_zero() {
            return Ok(None);
        }

        let Some(correction_rule) = &self.correction_rule else {
            return Ok(Some(raw));
        };

        let corrected = correction_rule.correct(raw, context).await?;
        if corrected < Decimal::ZERO {
            tracing::error!(
                discount_id = self.discount_id,
                discount = %corrected,
                "correction rule returned a negative discount, no discount is applicable"
            );
            return Ok(None);
        }
        Ok((!corrected.is_zero()).then_some(corrected))
    }

    /// Runs every eligibility rule concurrently and stops at the first
    /// negative answer. Dropping the pending futures cancels them.
    async fn is_eligible(&self, context: &RuleContext<'_>) -> Result<bool> {
        let mut pending: FuturesUnordered<_> = self
            .eligibility_rules
            .iter()
            .map(|rule| rule.eligible(context))
            .collect();

        while let Some(outcome) = pending.next().await {
            if !outcome? {
                tracing::debug!(discount_id = self.discount_id, "transaction is not eligible");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::discount::RuleSpec;
    use crate::domain::transaction::UnprocessedTransaction;
    use crate::error::ShippingError;
    use crate::infrastructure::in_memory::InMemoryTransactionRepository;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Fixed(bool);

    #[async_trait]
    impl EligibilityRule for Fixed {
        async fn eligible(&self, _context: &RuleContext<'_>) -> Result<bool> {
            Ok(self.0)
        }
    }

    /// Never answers; only completes if it is cancelled.
    #[derive(Debug)]
    struct Stalled;

    #[async_trait]
    impl EligibilityRule for Stalled {
        async fn eligible(&self, _context: &RuleContext<'_>) -> Result<bool> {
            futures::future::pending::<()>().await;
            Ok(true)
        }
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl EligibilityRule for Failing {
        async fn eligible(&self, _context: &RuleContext<'_>) -> Result<bool> {
            Err(ShippingError::Storage("history unavailable".to_string()))
        }
    }

    #[derive(Debug, Clone)]
    struct CountingSize {
        amount: Decimal,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SizeRule for CountingSize {
        async fn compute_discount(&self, _context: &RuleContext<'_>) -> Result<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.amount)
        }
    }

    #[derive(Debug, Clone)]
    struct FixedCorrection {
        amount: Decimal,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CorrectionRule for FixedCorrection {
        async fn correct(&self, _discount: Decimal, _context: &RuleContext<'_>) -> Result<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.amount)
        }
    }

    fn size(amount: Decimal) -> CountingSize {
        CountingSize {
            amount,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn correction(amount: Decimal) -> FixedCorrection {
        FixedCorrection {
            amount,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    async fn run(executor: &DiscountRuleExecutor) -> Result<Option<Decimal>> {
        let transaction =
            UnprocessedTransaction::new(NaiveDate::from_ymd_opt(2018, 9, 1).unwrap(), "A", "S").unwrap();
        let history = InMemoryTransactionRepository::new();
        let context = RuleContext {
            transaction: &transaction,
            price: dec!(3.00),
            shipping_plans: &[],
            history: &history,
        };
        executor.evaluate(&context).await
    }

    #[tokio::test]
    async fn test_no_eligibility_rules_is_vacuously_eligible() {
        let executor = DiscountRuleExecutor::new(1, Box::new(size(dec!(1.50))), Vec::new(), None);
        assert_eq!(run(&executor).await.unwrap(), Some(dec!(1.50)));
    }

    #[tokio::test]
    async fn test_ineligible_short_circuits_size_and_correction() {
        let size_rule = size(dec!(1.50));
        let correction_rule = correction(dec!(1.00));
        let executor = DiscountRuleExecutor::new(
            1,
            Box::new(size_rule.clone()),
            vec![Box::new(Stalled), Box::new(Fixed(false)), Box::new(Stalled)],
            Some(Box::new(correction_rule.clone())),
        );

        assert_eq!(run(&executor).await.unwrap(), None);
        assert_eq!(size_rule.calls.load(Ordering::SeqCst), 0);
        assert_eq!(correction_rule.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_eligible_applies_discount() {
        let executor = DiscountRuleExecutor::new(
            1,
            Box::new(size(dec!(2.00))),
            vec![Box::new(Fixed(true)), Box::new(Fixed(true))],
            None,
        );
        assert_eq!(run(&executor).await.unwrap(), Some(dec!(2.00)));
    }

    #[tokio::test]
    async fn test_eligibility_failure_propagates() {
        let executor = DiscountRuleExecutor::new(1, Box::new(size(dec!(2.00))), vec![Box::new(Failing)], None);
        assert!(matches!(run(&executor).await, Err(ShippingError::Storage(_))));
    }

    #[tokio::test]
    async fn test_negative_or_zero_raw_discount_is_no_discount() {
        let correction_rule = correction(dec!(1.00));
        let executor = DiscountRuleExecutor::new(
            1,
            Box::new(size(dec!(-1.00))),
            Vec::new(),
            Some(Box::new(correction_rule.clone())),
        );
        assert_eq!(run(&executor).await.unwrap(), None);
        assert_eq!(correction_rule.calls.load(Ordering::SeqCst), 0);

        let executor = DiscountRuleExecutor::new(1, Box::new(size(Decimal::ZERO)), Vec::new(), None);
        assert_eq!(run(&executor).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_correction_outcomes() {
        for (corrected, expected) in [
            (dec!(0.75), Some(dec!(0.75))),
            (Decimal::ZERO, None),
            (dec!(-0.25), None),
        ] {
            let executor = DiscountRuleExecutor::new(
                1,
                Box::new(size(dec!(2.00))),
                Vec::new(),
                Some(Box::new(correction(corrected))),
            );
            assert_eq!(run(&executor).await.unwrap(), expected);
        }
    }

    #[test]
    fn test_from_definition_rejects_unknown_rules() {
        let registry = RuleRegistry::with_builtin_rules().unwrap();
        let definition = DiscountRuleDefinition::new(3, RuleSpec::new("full-price"))
            .with_eligibility(RuleSpec::new("monthly-limiter"));

        let err = DiscountRuleExecutor::from_definition(&definition, &registry).unwrap_err();
        assert!(matches!(err, ShippingError::Configuration(_)));
    }

    #[test]
    fn test_from_definition_binds_all_parts() {
        let registry = RuleRegistry::with_builtin_rules().unwrap();
        let definition = DiscountRuleDefinition::new(3, RuleSpec::new("full-price"))
            .with_eligibility(RuleSpec::with_params(
                "attributes-equal",
                serde_json::json!({"carrier": "A"}),
            ))
            .with_correction(RuleSpec::with_params(
                "monthly-limiter",
                serde_json::json!({"cap": "10"}),
            ));

        let executor = DiscountRuleExecutor::from_definition(&definition, &registry).unwrap();
        assert_eq!(executor.discount_id(), 3);
        assert_eq!(executor.eligibility_rules.len(), 1);
        assert!(executor.correction_rule.is_some());
    }
}
