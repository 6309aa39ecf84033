use crate::application::dto::TransactionRequest;
use crate::error::{Result, ShippingError};
use std::io::Read;

/// Reads transaction requests from a CSV source with a
/// `date,package_size,carrier` header.
///
/// Columns are matched by header name; surrounding whitespace is trimmed.
pub struct TransactionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransactionReader<R> {
    /// Creates a new `TransactionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one request per record. A malformed record
    /// yields an error without ending the iteration.
    pub fn requests(self) -> impl Iterator<Item = Result<TransactionRequest>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ShippingError::from))
    }
}
