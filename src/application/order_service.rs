use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::domain::audit::{AuditEntry, AuditFilter};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    validate_cart, Actor, CartLine, ListResult, Order, OrderStatus, PlaceOrder,
};
use crate::domain::ports::{AuditStore, OrderRepository, PaymentGateway, PaymentIntent};
use crate::domain::transition::TransitionRules;

use super::audit::AuditRecorder;

pub const MAX_PAGE_SIZE: i64 = 100;

/// Order placement and fulfillment. Every method is blocking; HTTP handlers
/// run them on the blocking pool.
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentGateway>,
    audit_log: Arc<dyn AuditStore>,
    recorder: AuditRecorder,
    rules: TransitionRules,
    currency: String,
}

impl OrderService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentGateway>,
        audit_log: Arc<dyn AuditStore>,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            repo,
            payments,
            audit_log,
            recorder,
            rules: TransitionRules::default(),
            currency: "thb".to_string(),
        }
    }

    pub fn with_rules(mut self, rules: TransitionRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn place_order(
        &self,
        user_id: i32,
        request: &PlaceOrder,
        source: Option<String>,
    ) -> Result<Order, DomainError> {
        let order = self.repo.place(user_id, request).inspect_err(|e| {
            log::warn!("Order placement for user {} rejected: {}", user_id, e);
        })?;
        log::info!(
            "Order {} placed by user {} for {}",
            order.id,
            user_id,
            order.total_amount
        );

        self.recorder.record(AuditEntry {
            user_id: Some(user_id),
            action: "CREATE_ORDER".to_string(),
            table_name: "orders".to_string(),
            record_id: Some(order.id),
            old_values: None,
            new_values: snapshot(&order),
            ip_address: source,
            timestamp: Utc::now(),
        });
        Ok(order)
    }

    pub fn get_order(&self, actor: &Actor, order_id: i32) -> Result<Order, DomainError> {
        let order = self.repo.find_by_id(order_id)?.ok_or(DomainError::NotFound)?;
        actor.ensure_can_read(order.user_id)?;
        Ok(order)
    }

    pub fn list_orders_for_user(
        &self,
        actor: &Actor,
        user_id: i32,
    ) -> Result<Vec<Order>, DomainError> {
        actor.ensure_can_read(user_id)?;
        self.repo.list_for_user(user_id)
    }

    pub fn list_all_orders(
        &self,
        actor: &Actor,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        actor.ensure_admin()?;
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        if (page - 1).checked_mul(limit).is_none() {
            return Err(DomainError::Validation(format!("page {page} is out of range")));
        }
        self.repo.list(page, limit)
    }

    /// Moves an order to `new_status` and reports the change to the audit
    /// trail once committed.
    pub fn update_order_status(
        &self,
        actor: &Actor,
        order_id: i32,
        new_status: OrderStatus,
        source: Option<String>,
    ) -> Result<Order, DomainError> {
        actor.ensure_admin()?;

        let change = self
            .repo
            .transition(order_id, new_status, &self.rules)
            .inspect_err(|e| {
                log::warn!(
                    "Status change of order {} to {} by user {} rejected: {}",
                    order_id,
                    new_status,
                    actor.user_id,
                    e
                );
            })?;
        log::info!(
            "Order {} moved from {} to {} by user {}",
            order_id,
            change.before.status,
            change.after.status,
            actor.user_id
        );

        self.recorder.record(AuditEntry {
            user_id: Some(actor.user_id),
            action: "UPDATE_ORDER_STATUS".to_string(),
            table_name: "orders".to_string(),
            record_id: Some(order_id),
            old_values: snapshot(&change.before),
            new_values: snapshot(&change.after),
            ip_address: source,
            timestamp: Utc::now(),
        });
        Ok(change.after)
    }

    /// Charges what the catalog says the cart costs, never a client amount.
    pub fn create_payment_intent(&self, lines: &[CartLine]) -> Result<PaymentIntent, DomainError> {
        validate_cart(lines)?;
        let priced = self.repo.quote(lines)?;
        let amount = priced.amount_minor_units()?;
        self.payments
            .create_payment_intent(amount, &self.currency)
            .inspect_err(|e| log::error!("Payment intent for {} failed: {}", amount, e))
    }

    pub fn audit_entries(
        &self,
        actor: &Actor,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEntry>, DomainError> {
        actor.ensure_admin()?;
        let filter = AuditFilter {
            limit: filter.limit.clamp(1, MAX_PAGE_SIZE),
            offset: filter.offset.max(0),
            ..filter.clone()
        };
        self.audit_log
            .query(&filter)
            .map_err(|e| DomainError::Internal(e.to_string()))
    }

    pub fn health(&self) -> Result<(), DomainError> {
        self.repo.ping()
    }
}

fn snapshot(order: &Order) -> Option<Value> {
    serde_json::to_value(order)
        .inspect_err(|e| log::warn!("Could not snapshot order {}: {}", order.id, e))
        .ok()
}
