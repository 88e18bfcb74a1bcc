pub mod audit;
pub mod order_service;
