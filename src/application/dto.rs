use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A transaction as submitted by a client, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// ISO-8601 date (`YYYY-MM-DD`).
    pub date: String,
    pub carrier: String,
    pub package_size: String,
}

impl TransactionRequest {
    pub fn new(date: &str, carrier: &str, package_size: &str) -> Self {
        Self {
            date: date.to_string(),
            carrier: carrier.to_string(),
            package_size: package_size.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionResponse {
    /// Price after the discount. Not clamped at zero.
    pub reduced_price: Decimal,
    pub applied_discount: Option<Decimal>,
}
