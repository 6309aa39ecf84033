use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Status reported for every request validation failure.
pub const CLIENT_ERROR_STATUS: u16 = 422;
const INTERNAL_ERROR_STATUS: u16 = 500;

#[derive(Error, Debug)]
pub enum ShippingError {
    #[error("{0}")]
    InvalidTransactionRequest(String),
    #[error("Carrier with code '{0}' does not exist")]
    CarrierDoesNotExist(String),
    #[error("Carrier with code '{0}' is disabled")]
    CarrierDisabled(String),
    #[error("Transactions older than {} are not supported", minimum_date_label(.0))]
    InvalidTransactionDate(NaiveDate),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Rule evaluation error: {0}")]
    RuleEvaluation(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Lock is no longer owned")]
    LockNotOwned,
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("Unit of work error: {0}")]
    UnitOfWork(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

impl ShippingError {
    pub fn invalid_request() -> Self {
        Self::InvalidTransactionRequest("Transaction request validation failed".to_string())
    }

    /// True for failures caused by the request itself rather than by the
    /// system processing it.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransactionRequest(_)
                | Self::CarrierDoesNotExist(_)
                | Self::CarrierDisabled(_)
                | Self::InvalidTransactionDate(_)
        )
    }

    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            CLIENT_ERROR_STATUS
        } else {
            INTERNAL_ERROR_STATUS
        }
    }
}

/// Shortest form of the cutoff date that still names it exactly.
fn minimum_date_label(date: &NaiveDate) -> String {
    if date.day() > 1 {
        date.format("%Y-%m-%d").to_string()
    } else if date.month() > 1 {
        date.format("%Y-%m").to_string()
    } else {
        date.format("%Y").to_string()
    }
}

pub type Result<T> = std::result::Result<T, ShippingError>;
