#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shipdisc::application::dto::{TransactionRequest, TransactionResponse};
use shipdisc::application::processor::TransactionProcessor;
use shipdisc::domain::carrier::{CarrierStatus, ShippingPlan};
use shipdisc::domain::discount::DiscountRuleDefinition;
use shipdisc::domain::ports::{Lock, LockError, LockRef, UnitOfWork};
use shipdisc::error::Result;
use shipdisc::infrastructure::in_memory::{
    InMemoryCarrierRepository, InMemoryTransactionRepository, StaticDiscountRuleRepository,
};
use shipdisc::rules::RuleRegistry;
use std::sync::{Arc, Mutex};

/// Log lines written while a [`capture_logs`] guard is alive.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Routes this thread's events into memory until the guard is dropped.
/// `#[tokio::test]` runs on a single thread, so the processor's events land here.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

pub fn shipping_plans() -> Vec<ShippingPlan> {
    [
        ("A", "XS", dec!(2)),
        ("A", "S", dec!(3)),
        ("A", "M", dec!(14.7)),
        ("A", "L", dec!(20.7)),
        ("A", "XL", dec!(28.8)),
        ("A", "XXL", dec!(35.2)),
        ("B", "XS", dec!(3.5)),
        ("B", "S", dec!(6.00)),
        ("B", "M", dec!(9.00)),
        ("B", "L", dec!(12.00)),
        ("B", "XL", dec!(40.8)),
        ("B", "XXL", dec!(20.2)),
    ]
    .into_iter()
    .map(|(carrier, size, price)| ShippingPlan::new(carrier, size, price).unwrap())
    .collect()
}

pub fn carrier_statuses() -> Vec<CarrierStatus> {
    vec![CarrierStatus::new("A", true), CarrierStatus::new("B", true)]
}

/// Lock double that always grants `acquire` and can be told to report a lost
/// lease on `reacquire` or `release`.
#[derive(Default)]
pub struct ScriptedLock {
    pub lose_on_reacquire: bool,
    pub lose_on_release: bool,
    pub calls: Mutex<Vec<&'static str>>,
}

impl ScriptedLock {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Lock for ScriptedLock {
    async fn acquire(&self) -> std::result::Result<(), LockError> {
        self.record("acquire");
        Ok(())
    }

    async fn release(&self) -> std::result::Result<(), LockError> {
        self.record("release");
        if self.lose_on_release {
            return Err(LockError::NotOwned);
        }
        Ok(())
    }

    async fn reacquire(&self) -> std::result::Result<(), LockError> {
        self.record("reacquire");
        if self.lose_on_reacquire {
            return Err(LockError::NotOwned);
        }
        Ok(())
    }
}

/// Delegates to an in-memory unit of work and records every call.
pub struct RecordingUnitOfWork {
    inner: InMemoryTransactionRepository,
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingUnitOfWork {
    pub fn new(inner: InMemoryTransactionRepository) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl UnitOfWork for RecordingUnitOfWork {
    async fn begin(&self) -> Result<()> {
        self.record("begin");
        self.inner.begin().await
    }

    async fn commit(&self) -> Result<()> {
        self.record("commit");
        self.inner.commit().await
    }

    async fn abort(&self) -> Result<()> {
        self.record("abort");
        self.inner.abort().await
    }
}

pub struct Harness {
    pub processor: TransactionProcessor,
    pub carriers: Arc<InMemoryCarrierRepository>,
    pub transactions: InMemoryTransactionRepository,
    pub unit_of_work: Arc<RecordingUnitOfWork>,
}

pub fn harness(rules: Vec<DiscountRuleDefinition>) -> Harness {
    harness_with_lock(rules, Arc::new(ScriptedLock::default()))
}

pub fn harness_with_lock(rules: Vec<DiscountRuleDefinition>, lock: LockRef) -> Harness {
    harness_with(rules, InMemoryTransactionRepository::new(), lock)
}

/// Builds a processor over the fixture carriers. Processors built from the
/// same `transactions` share one history.
pub fn harness_with(
    rules: Vec<DiscountRuleDefinition>,
    transactions: InMemoryTransactionRepository,
    lock: LockRef,
) -> Harness {
    let carriers = Arc::new(InMemoryCarrierRepository::new(
        shipping_plans(),
        carrier_statuses(),
    ));
    let unit_of_work = Arc::new(RecordingUnitOfWork::new(transactions.clone()));
    let processor = TransactionProcessor::new(
        carriers.clone(),
        Arc::new(StaticDiscountRuleRepository::new(rules)),
        Arc::new(transactions.clone()),
        lock,
        unit_of_work.clone(),
        Arc::new(RuleRegistry::with_builtin_rules().unwrap()),
    );
    Harness {
        processor,
        carriers,
        transactions,
        unit_of_work,
    }
}

/// `(date, carrier, package_size)` triples.
pub fn requests(rows: &[(&str, &str, &str)]) -> Vec<TransactionRequest> {
    rows.iter()
        .map(|(date, carrier, size)| TransactionRequest::new(date, carrier, size))
        .collect()
}

pub async fn discounted_prices(
    processor: &TransactionProcessor,
    rows: &[(&str, &str, &str)],
) -> Vec<TransactionResponse> {
    let mut responses = Vec::new();
    for request in requests(rows) {
        responses.push(processor.process(&request).await.unwrap());
    }
    responses
}

pub async fn applied_discount_bits(
    processor: &TransactionProcessor,
    rows: &[(&str, &str, &str)],
) -> Vec<bool> {
    discounted_prices(processor, rows)
        .await
        .iter()
        .map(|response| response.applied_discount.is_some())
        .collect()
}

pub fn prices(responses: &[TransactionResponse]) -> Vec<(Decimal, Option<Decimal>)> {
    responses
        .iter()
        .map(|response| (response.reduced_price, response.applied_discount))
        .collect()
}
