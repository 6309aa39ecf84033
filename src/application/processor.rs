use super::dto::{TransactionRequest, TransactionResponse};
use crate::domain::carrier::ShippingPlan;
use crate::domain::discount::{ApplicableDiscount, DiscountId, select_largest};
use crate::domain::money::{Amount, to_currency};
use crate::domain::ports::{
    CarrierRepositoryRef, DiscountRuleRepositoryRef, LockError, LockRef, TransactionHistory,
    TransactionRepositoryRef, UnitOfWorkRef,
};
use crate::domain::transaction::{ProcessedTransaction, UnprocessedTransaction};
use crate::error::{Result, ShippingError};
use crate::rules::{DiscountRuleExecutor, RuleContext, RuleRegistry};
use chrono::NaiveDate;
use futures::future::try_join_all;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Earliest transaction date accepted unless configured otherwise.
pub fn default_minimum_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// The discount that won for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AppliedDiscount {
    discount_id: DiscountId,
    amount: Amount,
}

/// Prices shipping transactions and applies the best available discount.
///
/// Discount evaluation and persistence happen inside a critical section
/// guarded by the external lock and wrapped in a unit of work, so that
/// rules reading monthly aggregates never race a concurrent writer.
pub struct TransactionProcessor {
    carriers: CarrierRepositoryRef,
    discount_rules: DiscountRuleRepositoryRef,
    transactions: TransactionRepositoryRef,
    lock: LockRef,
    unit_of_work: UnitOfWorkRef,
    registry: Arc<RuleRegistry>,
    minimum_date: NaiveDate,
}

impl TransactionProcessor {
    /// Creates a new `TransactionProcessor` accepting transactions from
    /// [`default_minimum_date`] onwards.
    ///
    /// # Arguments
    ///
    /// * `carriers` - Carrier statuses and shipping plans.
    /// * `discount_rules` - The active rule definitions.
    /// * `transactions` - History read by rules and written on commit.
    /// * `lock` - Guards the critical section across processors.
    /// * `unit_of_work` - Makes the persisted transaction atomic.
    /// * `registry` - Binds rule names to implementations.
    pub fn new(
        carriers: CarrierRepositoryRef,
        discount_rules: DiscountRuleRepositoryRef,
        transactions: TransactionRepositoryRef,
        lock: LockRef,
        unit_of_work: UnitOfWorkRef,
        registry: Arc<RuleRegistry>,
    ) -> Self {
        Self {
            carriers,
            discount_rules,
            transactions,
            lock,
            unit_of_work,
            registry,
            minimum_date: default_minimum_date(),
        }
    }

    /// Rejects transactions dated before `minimum_date`.
    pub fn with_minimum_date(mut self, minimum_date: NaiveDate) -> Self {
        self.minimum_date = minimum_date;
        self
    }

    /// Processes one shipping transaction.
    ///
    /// Validation failures are returned before the lock is touched. Losing
    /// the lock while renewing it aborts the unit of work and fails the
    /// call; losing it on the final release only logs a warning.
    pub async fn process(&self, request: &TransactionRequest) -> Result<TransactionResponse> {
        let shipping_plans = self.carriers.shipping_plans().await?;
        let transaction = self.validate(request, &shipping_plans).await?;
        let price = price_of(&transaction, &shipping_plans)?;
        let executors = self.build_executors().await?;

        self.lock.acquire().await?;
        let settled = self
            .settle(&transaction, price, &shipping_plans, &executors)
            .await;
        let released = self.lock.release().await;

        let applied = match settled {
            Ok(applied) => {
                match released {
                    Ok(()) => {}
                    Err(LockError::NotOwned) => tracing::warn!(
                        "Failed to release lock after processing transaction. \
                         This means that a race condition may have occurred."
                    ),
                    Err(err) => return Err(err.into()),
                }
                applied
            }
            Err(err) => {
                if let Err(release_err) = released {
                    tracing::debug!(error = %release_err, "lock release failed while handling an error");
                }
                return Err(err);
            }
        };

        tracing::info!(
            date = %transaction.date,
            carrier = %transaction.carrier,
            package_size = %transaction.package_size,
            price = %price,
            discount_id = ?applied.map(|d| d.discount_id),
            discount = %applied.map_or_else(|| "-".to_string(), |d| d.amount.to_string()),
            "transaction processed"
        );
        respond(price, applied.map(|d| d.amount))
    }

    async fn validate(
        &self,
        request: &TransactionRequest,
        shipping_plans: &[ShippingPlan],
    ) -> Result<UnprocessedTransaction> {
        let date = request
            .date
            .trim()
            .parse::<NaiveDate>()
            .map_err(|_| ShippingError::invalid_request())?;
        let transaction = UnprocessedTransaction::new(date, &request.carrier, &request.package_size)?;

        match self.carriers.is_enabled(&transaction.carrier).await? {
            None => return Err(ShippingError::CarrierDoesNotExist(transaction.carrier)),
            Some(false) => return Err(ShippingError::CarrierDisabled(transaction.carrier)),
            Some(true) => {}
        }

        if transaction.date < self.minimum_date {
            return Err(ShippingError::InvalidTransactionDate(self.minimum_date));
        }

        if !shipping_plans
            .iter()
            .any(|plan| plan.serves(&transaction.carrier, &transaction.package_size))
        {
            return Err(ShippingError::InvalidTransactionRequest(format!(
                "carrier {} does not provide service for package size {}",
                transaction.carrier, transaction.package_size
            )));
        }

        Ok(transaction)
    }

    async fn build_executors(&self) -> Result<Vec<DiscountRuleExecutor>> {
        self.discount_rules
            .active_rules()
            .await?
            .iter()
            .map(|definition| DiscountRuleExecutor::from_definition(definition, &self.registry))
            .collect()
    }

    /// Runs the discount selection inside a unit of work: commit on success,
    /// abort on any failure.
    async fn settle(
        &self,
        transaction: &UnprocessedTransaction,
        price: Amount,
        shipping_plans: &[ShippingPlan],
        executors: &[DiscountRuleExecutor],
    ) -> Result<Option<AppliedDiscount>> {
        self.unit_of_work.begin().await?;
        match self
            .apply_best_discount(transaction, price, shipping_plans, executors)
            .await
        {
            Ok(applied) => {
                self.unit_of_work.commit().await?;
                Ok(applied)
            }
            Err(err) => {
                if let Err(abort_err) = self.unit_of_work.abort().await {
                    tracing::error!(error = %abort_err, "failed to abort unit of work");
                }
                Err(err)
            }
        }
    }

    async fn apply_best_discount(
        &self,
        transaction: &UnprocessedTransaction,
        price: Amount,
        shipping_plans: &[ShippingPlan],
        executors: &[DiscountRuleExecutor],
    ) -> Result<Option<AppliedDiscount>> {
        let history: &dyn TransactionHistory = self.transactions.as_ref();
        let context = RuleContext {
            transaction,
            price: price.value(),
            shipping_plans,
            history,
        };

        let outcomes = try_join_all(executors.iter().map(|executor| executor.evaluate(&context))).await?;
        let best = select_largest(executors.iter().zip(outcomes).filter_map(|(executor, amount)| {
            amount.map(|amount| ApplicableDiscount {
                discount_id: executor.discount_id(),
                amount,
            })
        }));

        let applied = best
            .map(|discount| {
                Amount::new(discount.amount).map(|amount| AppliedDiscount {
                    discount_id: discount.discount_id,
                    amount,
                })
            })
            .transpose()?;

        self.transactions
            .save(ProcessedTransaction::new(
                transaction.clone(),
                applied.map(|d| d.discount_id),
                applied.map(|d| d.amount),
            ))
            .await?;

        self.lock.reacquire().await?;
        Ok(applied)
    }
}

fn price_of(transaction: &UnprocessedTransaction, shipping_plans: &[ShippingPlan]) -> Result<Amount> {
    shipping_plans
        .iter()
        .find(|plan| plan.serves(&transaction.carrier, &transaction.package_size))
        .map(|plan| plan.price)
        .ok_or_else(ShippingError::invalid_request)
}

fn respond(price: Amount, discount: Option<Amount>) -> Result<TransactionResponse> {
    let reduced_price = price.value() - discount.map_or(Decimal::ZERO, |d| d.value());
    Ok(TransactionResponse {
        reduced_price: to_currency(reduced_price)?,
        applied_discount: discount.map(|d| d.value()),
    })
}
