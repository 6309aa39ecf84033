use crate::application::dto::{TransactionRequest, TransactionResponse};
use crate::domain::carrier::normalize_code;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Written in place of a discount when none was applied.
pub const NO_DISCOUNT: &str = "-";

#[derive(Serialize)]
struct ResponseRow<'a> {
    date: &'a str,
    package_size: String,
    carrier: String,
    reduced_price: Decimal,
    applied_discount: String,
}

/// Writes one CSV row per processed request.
pub struct ResponseWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new `ResponseWriter` over any `Write` sink (e.g., File, Stdout).
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_response(
        &mut self,
        request: &TransactionRequest,
        response: &TransactionResponse,
    ) -> Result<()> {
        self.writer.serialize(ResponseRow {
            date: request.date.trim(),
            package_size: normalize_code(&request.package_size),
            carrier: normalize_code(&request.carrier),
            reduced_price: response.reduced_price,
            applied_discount: response
                .applied_discount
                .map_or_else(|| NO_DISCOUNT.to_string(), |discount| discount.to_string()),
        })?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
