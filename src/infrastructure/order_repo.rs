use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::inventory;
use crate::domain::order::{CartLine, ListResult, Order, OrderStatus, PlaceOrder};
use crate::domain::ports::{Catalog, OrderRepository, StatusChange, StockLedger};
use crate::domain::pricing::{self, PricedCart, ProductSnapshot};
use crate::domain::transition::{self, TransitionRules};
use crate::schema::{order_lines, orders, products};

use super::models::{NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow, ProductRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::ResourceExhausted(e.to_string())
    }
}

// ── Catalog and stock, scoped to one connection ──────────────────────────────

/// Catalog reads and stock writes on a connection that may be inside an open
/// transaction.
struct PgCatalog<'c> {
    conn: &'c mut PgConnection,
}

impl Catalog for PgCatalog<'_> {
    fn active_product(&mut self, product_id: i32) -> Result<Option<ProductSnapshot>, DomainError> {
        let row = products::table
            .find(product_id)
            .select(ProductRow::as_select())
            .first(&mut *self.conn)
            .optional()?;
        Ok(row.map(ProductSnapshot::from))
    }
}

impl StockLedger for PgCatalog<'_> {
    fn available(&mut self, product_id: i32) -> Result<Option<i32>, DomainError> {
        Ok(products::table
            .find(product_id)
            .select(products::stock_quantity)
            .first(&mut *self.conn)
            .optional()?)
    }

    fn decrement(&mut self, product_id: i32, quantity: i32) -> Result<(), DomainError> {
        // Conditional update: the row lock taken here makes check-and-write a
        // single step, so concurrent payments cannot oversell.
        let updated = diesel::update(
            products::table
                .filter(products::id.eq(product_id))
                .filter(products::stock_quantity.ge(quantity)),
        )
        .set(products::stock_quantity.eq(products::stock_quantity - quantity))
        .execute(&mut *self.conn)?;

        if updated == 0 {
            return Err(DomainError::InsufficientStock {
                product_id,
                requested: quantity,
            });
        }
        Ok(())
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn insert_order(
    conn: &mut PgConnection,
    user_id: i32,
    priced: &PricedCart,
    request: &PlaceOrder,
) -> QueryResult<(OrderRow, Vec<OrderLineRow>)> {
    // 1. Insert the order
    let order: OrderRow = diesel::insert_into(orders::table)
        .values(&NewOrderRow {
            user_id,
            total_amount: priced.total.clone(),
            shipping_name: request.shipping.name.clone(),
            shipping_address: request.shipping.address.clone(),
            shipping_phone: request.shipping.phone.clone(),
            status: OrderStatus::Pending.as_str().to_string(),
        })
        .returning(OrderRow::as_returning())
        .get_result(conn)?;

    // 2. Insert order lines with the verified prices
    let new_lines: Vec<NewOrderLineRow> = priced
        .lines
        .iter()
        .map(|l| NewOrderLineRow {
            order_id: order.id,
            product_id: l.product_id,
            quantity: l.quantity,
            price_at_purchase: l.unit_price.clone(),
        })
        .collect();
    let lines = diesel::insert_into(order_lines::table)
        .values(&new_lines)
        .returning(OrderLineRow::as_returning())
        .get_results(conn)?;

    Ok((order, lines))
}

fn load_lines(conn: &mut PgConnection, order_id: i32) -> QueryResult<Vec<OrderLineRow>> {
    order_lines::table
        .filter(order_lines::order_id.eq(order_id))
        .select(OrderLineRow::as_select())
        .order(order_lines::id.asc())
        .load(conn)
}

impl OrderRepository for DieselOrderRepository {
    fn place(&self, user_id: i32, request: &PlaceOrder) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut catalog = PgCatalog { conn: &mut *conn };
            let priced =
                pricing::verify(&mut catalog, &request.lines, &request.asserted_total)?;
            inventory::reserve(&mut catalog, &priced.lines)?;

            let (order, lines) = insert_order(conn, user_id, &priced, request).map_err(|e| {
                log::error!("Inserting order for user {} failed: {}", user_id, e);
                DomainError::OrderCreationFailed(e.to_string())
            })?;
            order.into_order(lines)
        })
    }

    fn find_by_id(&self, id: i32) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines = load_lines(&mut conn, order.id)?;
        order.into_order(lines).map(Some)
    }

    fn list_for_user(&self, user_id: i32) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows = orders::table
                .filter(orders::user_id.eq(user_id))
                .select(OrderRow::as_select())
                .order((orders::created_at.desc(), orders::id.desc()))
                .load(conn)?;

            let lines = OrderLineRow::belonging_to(&rows)
                .select(OrderLineRow::as_select())
                .order(order_lines::id.asc())
                .load::<OrderLineRow>(conn)?
                .grouped_by(&rows);

            rows.into_iter()
                .zip(lines)
                .map(|(order, lines)| order.into_order(lines))
                .collect()
        })
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page.max(1) - 1).saturating_mul(limit);
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows = orders::table
                .select(OrderRow::as_select())
                .order((orders::created_at.desc(), orders::id.desc()))
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ListResult {
                items: rows
                    .into_iter()
                    .map(|o| o.into_order(vec![]))
                    .collect::<Result<_, _>>()?,
                total,
            })
        })
    }

    fn transition(
        &self,
        order_id: i32,
        new_status: OrderStatus,
        rules: &TransitionRules,
    ) -> Result<StatusChange, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Lock the order row; a concurrent transition waits here and
            //    then sees this one's committed state.
            let row = orders::table
                .find(order_id)
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound)?;
            let line_rows = load_lines(conn, order_id)?;
            let before = row.into_order(line_rows.clone())?;

            // 2. Decide the effects
            let plan = transition::plan(&before, new_status, rules)?;

            // 3. Stock leaves the shelf on payment
            if plan.decrement_stock {
                let mut ledger = PgCatalog { conn: &mut *conn };
                inventory::commit_stock(
                    &mut ledger,
                    before.lines.iter().map(|l| (l.product_id, l.quantity)),
                )?;
            }

            // 4. Write status and tracking number
            let updated: OrderRow = diesel::update(orders::table.find(order_id))
                .set((
                    orders::status.eq(plan.status.as_str()),
                    orders::tracking_number.eq(plan.tracking_number.clone()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;
            let after = updated.into_order(line_rows)?;

            Ok(StatusChange { before, after })
        })
    }

    fn quote(&self, lines: &[CartLine]) -> Result<PricedCart, DomainError> {
        let mut conn = self.pool.get()?;
        pricing::quote(&mut PgCatalog { conn: &mut *conn }, lines)
    }

    fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}
