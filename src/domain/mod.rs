pub mod audit;
pub mod errors;
pub mod inventory;
pub mod order;
pub mod ports;
pub mod pricing;
pub mod transition;
