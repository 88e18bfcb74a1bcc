use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use crate::domain::audit::AuditEntry;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderLine, ShippingInfo};
use crate::domain::pricing::ProductSnapshot;
use crate::schema::{audit_logs, order_lines, orders, products};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: i32,
    pub user_id: i32,
    pub total_amount: BigDecimal,
    pub shipping_name: String,
    pub shipping_address: String,
    pub shipping_phone: String,
    pub status: String,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn into_order(self, lines: Vec<OrderLineRow>) -> Result<Order, DomainError> {
        // A status outside the enum means the table was written by something
        // other than this service.
        let status = self.status.parse().map_err(|_| {
            DomainError::Internal(format!("order {} has status '{}'", self.id, self.status))
        })?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            total_amount: self.total_amount,
            shipping: ShippingInfo {
                name: self.shipping_name,
                address: self.shipping_address,
                phone: self.shipping_phone,
            },
            status,
            tracking_number: self.tracking_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
            lines: lines.into_iter().map(OrderLine::from).collect(),
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub user_id: i32,
    pub total_amount: BigDecimal,
    pub shipping_name: String,
    pub shipping_address: String,
    pub shipping_phone: String,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price_at_purchase: BigDecimal,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price_at_purchase: row.price_at_purchase,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price_at_purchase: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: i32,
    pub price: BigDecimal,
    pub stock_quantity: i32,
    pub is_active: bool,
}

impl From<ProductRow> for ProductSnapshot {
    fn from(row: ProductRow) -> Self {
        ProductSnapshot {
            id: row.id,
            price: row.price,
            stock_quantity: row.stock_quantity,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = audit_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AuditLogRow {
    pub id: i64,
    pub user_id: Option<i32>,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<i32>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditEntry {
    fn from(row: AuditLogRow) -> Self {
        AuditEntry {
            user_id: row.user_id,
            action: row.action,
            table_name: row.table_name,
            record_id: row.record_id,
            old_values: row.old_values,
            new_values: row.new_values,
            ip_address: row.ip_address,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = audit_logs)]
pub struct NewAuditLogRow {
    pub user_id: Option<i32>,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<i32>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&AuditEntry> for NewAuditLogRow {
    fn from(entry: &AuditEntry) -> Self {
        NewAuditLogRow {
            user_id: entry.user_id,
            action: entry.action.clone(),
            table_name: entry.table_name.clone(),
            record_id: entry.record_id,
            old_values: entry.old_values.clone(),
            new_values: entry.new_values.clone(),
            ip_address: entry.ip_address.clone(),
            timestamp: entry.timestamp,
        }
    }
}
