//! In-memory order store for tests and local runs without Postgres.
//!
//! Every write operation works on a copy of the state under one lock and
//! swaps it in only on success, which gives the same all-or-nothing
//! behaviour as a database transaction.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use chrono::Utc;

use crate::domain::errors::DomainError;
use crate::domain::inventory;
use crate::domain::order::{CartLine, ListResult, Order, OrderLine, OrderStatus, PlaceOrder};
use crate::domain::ports::{Catalog, OrderRepository, StatusChange, StockLedger};
use crate::domain::pricing::{self, PricedCart, ProductSnapshot};
use crate::domain::transition::{self, TransitionRules};

#[derive(Debug, Clone, Default)]
struct State {
    products: HashMap<i32, ProductSnapshot>,
    orders: BTreeMap<i32, Order>,
    next_product_id: i32,
    next_order_id: i32,
    next_line_id: i32,
    fail_on_insert: bool,
}

impl Catalog for State {
    fn active_product(&mut self, product_id: i32) -> Result<Option<ProductSnapshot>, DomainError> {
        Ok(self.products.get(&product_id).cloned())
    }
}

impl StockLedger for State {
    fn available(&mut self, product_id: i32) -> Result<Option<i32>, DomainError> {
        Ok(self.products.get(&product_id).map(|p| p.stock_quantity))
    }

    fn decrement(&mut self, product_id: i32, quantity: i32) -> Result<(), DomainError> {
        match self.products.get_mut(&product_id) {
            Some(product) if product.stock_quantity >= quantity => {
                product.stock_quantity -= quantity;
                Ok(())
            }
            _ => Err(DomainError::InsufficientStock {
                product_id,
                requested: quantity,
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("order store lock poisoned".to_string()))
    }

    /// Runs `f` against a copy of the state and keeps the copy only if `f`
    /// succeeds.
    fn atomically<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut guard = self.lock()?;
        let mut staged = guard.clone();
        let value = f(&mut staged)?;
        *guard = staged;
        Ok(value)
    }

    // Seeding and inspection helpers below panic on a poisoned lock.

    pub fn add_product(&self, price: BigDecimal, stock_quantity: i32, is_active: bool) -> i32 {
        let mut state = self.state.lock().expect("order store lock poisoned");
        state.next_product_id += 1;
        let id = state.next_product_id;
        state.products.insert(
            id,
            ProductSnapshot {
                id,
                price,
                stock_quantity,
                is_active,
            },
        );
        id
    }

    pub fn set_price(&self, product_id: i32, price: BigDecimal) {
        let mut state = self.state.lock().expect("order store lock poisoned");
        if let Some(product) = state.products.get_mut(&product_id) {
            product.price = price;
        }
    }

    pub fn set_stock(&self, product_id: i32, stock_quantity: i32) {
        let mut state = self.state.lock().expect("order store lock poisoned");
        if let Some(product) = state.products.get_mut(&product_id) {
            product.stock_quantity = stock_quantity;
        }
    }

    pub fn stock_of(&self, product_id: i32) -> Option<i32> {
        let state = self.state.lock().expect("order store lock poisoned");
        state.products.get(&product_id).map(|p| p.stock_quantity)
    }

    /// Makes every following order insert fail, as a broken database would.
    pub fn fail_inserts(&self, fail: bool) {
        self.state.lock().expect("order store lock poisoned").fail_on_insert = fail;
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().expect("order store lock poisoned").orders.len()
    }

    pub fn line_count(&self) -> usize {
        let state = self.state.lock().expect("order store lock poisoned");
        state.orders.values().map(|o| o.lines.len()).sum()
    }
}

fn insert_order(
    state: &mut State,
    user_id: i32,
    priced: PricedCart,
    request: &PlaceOrder,
) -> Result<Order, DomainError> {
    state.next_order_id += 1;
    let order_id = state.next_order_id;
    let now = Utc::now();

    let mut lines = Vec::with_capacity(priced.lines.len());
    for line in priced.lines {
        if state.fail_on_insert {
            return Err(DomainError::OrderCreationFailed(
                "order line insert rejected".to_string(),
            ));
        }
        state.next_line_id += 1;
        lines.push(OrderLine {
            id: state.next_line_id,
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price_at_purchase: line.unit_price,
        });
    }

    let order = Order {
        id: order_id,
        user_id,
        total_amount: priced.total,
        shipping: request.shipping.clone(),
        status: OrderStatus::Pending,
        tracking_number: None,
        created_at: now,
        updated_at: now,
        lines,
    };
    state.orders.insert(order_id, order.clone());
    Ok(order)
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

impl OrderRepository for InMemoryOrderRepository {
    fn place(&self, user_id: i32, request: &PlaceOrder) -> Result<Order, DomainError> {
        self.atomically(|state| {
            let priced = pricing::verify(state, &request.lines, &request.asserted_total)?;
            inventory::reserve(state, &priced.lines)?;
            insert_order(state, user_id, priced, request)
        })
    }

    fn find_by_id(&self, id: i32) -> Result<Option<Order>, DomainError> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    fn list_for_user(&self, user_id: i32) -> Result<Vec<Order>, DomainError> {
        let mut orders: Vec<Order> = self
            .lock()?
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let state = self.lock()?;
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        newest_first(&mut orders);
        let total = orders.len() as i64;
        let items = orders
            .into_iter()
            .skip((page.max(1) - 1).saturating_mul(limit).max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|mut o| {
                o.lines.clear();
                o
            })
            .collect();
        Ok(ListResult { items, total })
    }

    fn transition(
        &self,
        order_id: i32,
        new_status: OrderStatus,
        rules: &TransitionRules,
    ) -> Result<StatusChange, DomainError> {
        self.atomically(|state| {
            let before = state
                .orders
                .get(&order_id)
                .cloned()
                .ok_or(DomainError::NotFound)?;
            let plan = transition::plan(&before, new_status, rules)?;

            if plan.decrement_stock {
                inventory::commit_stock(
                    state,
                    before.lines.iter().map(|l| (l.product_id, l.quantity)),
                )?;
            }

            let mut after = plan.apply(&before);
            after.updated_at = Utc::now();
            state.orders.insert(order_id, after.clone());
            Ok(StatusChange { before, after })
        })
    }

    fn quote(&self, lines: &[CartLine]) -> Result<PricedCart, DomainError> {
        pricing::quote(&mut *self.lock()?, lines)
    }

    fn ping(&self) -> Result<(), DomainError> {
        self.lock().map(|_| ())
    }
}
