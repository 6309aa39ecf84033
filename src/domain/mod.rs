//! Domain layer: shipping entities, money, discount definitions and the ports
//! the processor talks to.

pub mod carrier;
pub mod discount;
pub mod money;
pub mod ports;
pub mod transaction;
