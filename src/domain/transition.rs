//! Order status state machine.
//!
//! ```text
//! pending ──► paid ──► shipped ──► completed
//!    │         │          │
//!    └─────────┴──────────┴──────► cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal under every policy. The
//! permissive policy lets any non-terminal status move to any status; the
//! forward policy only allows the arrows above plus same-status updates.

use std::str::FromStr;

use rand::Rng;

use super::errors::DomainError;
use super::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Forward,
}

impl TransitionPolicy {
    pub fn allows(&self, from: OrderStatus, to: OrderStatus) -> bool {
        if from.is_terminal() {
            return false;
        }
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Forward => {
                from == to
                    || to == OrderStatus::Cancelled
                    || matches!(
                        (from, to),
                        (OrderStatus::Pending, OrderStatus::Paid)
                            | (OrderStatus::Paid, OrderStatus::Shipped)
                            | (OrderStatus::Shipped, OrderStatus::Completed)
                    )
            }
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "forward" => Ok(TransitionPolicy::Forward),
            other => Err(format!("unknown transition policy '{other}'")),
        }
    }
}

/// Shipment identifiers: a two-letter country prefix and nine random digits.
/// Uniqueness is best-effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingNumberGenerator {
    prefix: String,
}

impl TrackingNumberGenerator {
    pub fn new(prefix: &str) -> Result<Self, String> {
        if prefix.len() == 2 && prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self {
                prefix: prefix.to_ascii_uppercase(),
            })
        } else {
            Err(format!(
                "tracking prefix must be two ASCII letters, got '{prefix}'"
            ))
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn generate(&self) -> String {
        let digits: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
        format!("{}{:09}", self.prefix, digits)
    }
}

impl Default for TrackingNumberGenerator {
    fn default() -> Self {
        Self {
            prefix: "TH".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransitionRules {
    pub policy: TransitionPolicy,
    pub tracking: TrackingNumberGenerator,
}

/// What a repository must write for one accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub decrement_stock: bool,
}

impl TransitionPlan {
    pub fn apply(&self, order: &Order) -> Order {
        let mut next = order.clone();
        next.status = self.status;
        next.tracking_number = self.tracking_number.clone();
        next
    }
}

/// Decides the effects of moving `current` to `target`. Stock is only
/// decremented on pending → paid; a tracking number is assigned on the
/// first move to shipped and kept afterwards.
pub fn plan(
    current: &Order,
    target: OrderStatus,
    rules: &TransitionRules,
) -> Result<TransitionPlan, DomainError> {
    if !rules.policy.allows(current.status, target) {
        return Err(DomainError::InvalidTransition {
            from: current.status,
            to: target,
        });
    }

    let tracking_number = match (&current.tracking_number, target) {
        (Some(existing), _) => Some(existing.clone()),
        (None, OrderStatus::Shipped) => Some(rules.tracking.generate()),
        (None, _) => None,
    };

    Ok(TransitionPlan {
        status: target,
        tracking_number,
        decrement_stock: current.status == OrderStatus::Pending && target == OrderStatus::Paid,
    })
}
