//! Outer adapters: the CSV request/response formats used by the binary.

pub mod csv;
