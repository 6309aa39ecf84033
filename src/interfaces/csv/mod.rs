pub mod response_writer;
pub mod transaction_reader;
