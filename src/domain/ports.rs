use super::audit::{AuditEntry, AuditError, AuditFilter};
use super::errors::DomainError;
use super::order::{CartLine, ListResult, Order, OrderStatus, PlaceOrder};
use super::pricing::{PricedCart, ProductSnapshot};
use super::transition::TransitionRules;

/// Read access to authoritative catalog data. Implementations read current
/// storage on every call.
pub trait Catalog {
    fn active_product(&mut self, product_id: i32) -> Result<Option<ProductSnapshot>, DomainError>;
}

/// The only writer of `stock_quantity`.
pub trait StockLedger {
    /// Current stock, or `None` when the product does not exist.
    fn available(&mut self, product_id: i32) -> Result<Option<i32>, DomainError>;

    /// Atomically subtracts `quantity`, failing with `InsufficientStock`
    /// instead of going negative.
    fn decrement(&mut self, product_id: i32, quantity: i32) -> Result<(), DomainError>;
}

/// Before and after snapshots of a committed status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub before: Order,
    pub after: Order,
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Verifies prices, checks stock and writes the order with its lines,
    /// all in one transaction.
    fn place(&self, user_id: i32, request: &PlaceOrder) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: i32) -> Result<Option<Order>, DomainError>;
    fn list_for_user(&self, user_id: i32) -> Result<Vec<Order>, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    fn transition(
        &self,
        order_id: i32,
        new_status: OrderStatus,
        rules: &TransitionRules,
    ) -> Result<StatusChange, DomainError>;
    /// Prices a cart from the catalog without writing anything.
    fn quote(&self, lines: &[CartLine]) -> Result<PricedCart, DomainError>;
    fn ping(&self) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub client_secret: String,
    pub amount_minor_units: i64,
    pub currency: String,
}

pub trait PaymentGateway: Send + Sync + 'static {
    fn create_payment_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
    ) -> Result<PaymentIntent, DomainError>;
}

pub trait AuditStore: Send + Sync + 'static {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError>;
}
