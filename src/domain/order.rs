use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::pricing;

/// Most lines one cart may carry.
pub const MAX_CART_LINES: usize = 100;
/// Most units of one product a single line may ask for.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// Lifecycle status of an order. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" | "user" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

/// The authenticated caller, as established by the upstream auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners may read their own orders; admins may read anyone's.
    pub fn ensure_can_read(&self, owner_id: i32) -> Result<(), DomainError> {
        if self.user_id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::Forbidden)
        }
    }

    pub fn ensure_admin(&self) -> Result<(), DomainError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::Forbidden)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl ShippingInfo {
    /// Trims every field and checks lengths and the phone character set.
    pub fn parse(name: &str, address: &str, phone: &str) -> Result<Self, DomainError> {
        let name = name.trim();
        let address = address.trim();
        let phone = phone.trim();

        let name_len = name.chars().count();
        if !(2..=100).contains(&name_len) {
            return Err(DomainError::Validation(
                "shipping name must be 2-100 characters".to_string(),
            ));
        }
        let address_len = address.chars().count();
        if !(5..=500).contains(&address_len) {
            return Err(DomainError::Validation(
                "shipping address must be 5-500 characters".to_string(),
            ));
        }
        let phone_ok = (7..=20).contains(&phone.chars().count())
            && phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'));
        if !phone_ok {
            return Err(DomainError::Validation("invalid phone".to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            address: address.to_string(),
            phone: phone.to_string(),
        })
    }
}

/// A validated placement request.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub lines: Vec<CartLine>,
    pub asserted_total: BigDecimal,
    pub shipping: ShippingInfo,
}

impl PlaceOrder {
    pub fn new(
        lines: Vec<CartLine>,
        asserted_total: BigDecimal,
        shipping: ShippingInfo,
    ) -> Result<Self, DomainError> {
        validate_cart(&lines)?;
        pricing::check_amount(&asserted_total)?;
        Ok(Self {
            lines,
            asserted_total,
            shipping,
        })
    }
}

pub fn validate_cart(lines: &[CartLine]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::Validation(
            "items must be a non-empty array".to_string(),
        ));
    }
    if lines.len() > MAX_CART_LINES {
        return Err(DomainError::Validation(format!(
            "a cart holds at most {MAX_CART_LINES} items"
        )));
    }
    for line in lines {
        if line.product_id < 1 {
            return Err(DomainError::Validation(format!(
                "product id {} is invalid",
                line.product_id
            )));
        }
        if line.quantity < 1 {
            return Err(DomainError::Validation(format!(
                "quantity for product {} must be positive",
                line.product_id
            )));
        }
        if line.quantity > MAX_LINE_QUANTITY {
            return Err(DomainError::Validation(format!(
                "quantity for product {} exceeds {MAX_LINE_QUANTITY}",
                line.product_id
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price_at_purchase: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub total_amount: BigDecimal,
    pub shipping: ShippingInfo,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    pub fn lines_total(&self) -> BigDecimal {
        self.lines
            .iter()
            .map(|l| &l.price_at_purchase * BigDecimal::from(l.quantity))
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}
