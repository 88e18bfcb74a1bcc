//! Order totals computed from catalog prices. Client-supplied prices are
//! never used; the client's asserted total is only compared against ours.

use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};

use super::errors::DomainError;
use super::order::CartLine;
use super::ports::Catalog;

/// Largest accepted difference between the asserted and computed totals:
/// one minor currency unit.
pub fn price_tolerance() -> BigDecimal {
    BigDecimal::new(1.into(), 2)
}

/// Integer digits an amount may have; matches the `NUMERIC(12, 2)` columns.
pub const MAX_AMOUNT_INTEGER_DIGITS: usize = 10;

/// Largest storable amount, 9 999 999 999.99.
pub fn max_amount() -> BigDecimal {
    BigDecimal::new(999_999_999_999i64.into(), 2)
}

/// Parses a client amount such as `"199.98"`. Only plain decimals with at
/// most two fraction digits are accepted: exponents, signs and long inputs
/// are rejected before any arithmetic happens.
pub fn parse_amount(raw: &str) -> Result<BigDecimal, DomainError> {
    let raw = raw.trim();
    let invalid = || DomainError::Validation(format!("invalid amount '{raw}'"));

    let (integer, fraction) = match raw.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (raw, None),
    };
    if integer.is_empty()
        || integer.len() > MAX_AMOUNT_INTEGER_DIGITS
        || !integer.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    if let Some(fraction) = fraction {
        if fraction.is_empty()
            || fraction.len() > 2
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
    }

    let amount = BigDecimal::from_str(raw).map_err(|_| invalid())?;
    check_amount(&amount)?;
    Ok(amount)
}

/// Rejects amounts that are negative, finer than one minor unit or too large
/// to store. The scale is checked first so oversized exponents cost nothing.
pub fn check_amount(amount: &BigDecimal) -> Result<(), DomainError> {
    let (_, scale) = amount.as_bigint_and_exponent();
    if !(0..=2).contains(&scale) {
        return Err(DomainError::Validation(
            "amount must have at most two decimal places".to_string(),
        ));
    }
    if *amount < BigDecimal::from(0) {
        return Err(DomainError::Validation(
            "amount must not be negative".to_string(),
        ));
    }
    if *amount > max_amount() {
        return Err(DomainError::Validation(format!(
            "amount exceeds {}",
            max_amount()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub id: i32,
    pub price: BigDecimal,
    pub stock_quantity: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedLine {
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl VerifiedLine {
    pub fn subtotal(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<VerifiedLine>,
    pub total: BigDecimal,
}

impl PricedCart {
    /// The total in minor units (satang, cents), rounded half-up.
    pub fn amount_minor_units(&self) -> Result<i64, DomainError> {
        (&self.total * BigDecimal::from(100))
            .round(0)
            .to_i64()
            .ok_or_else(|| DomainError::Validation("order total out of range".to_string()))
    }
}

/// Looks up every line's current price; fails if any product is missing or
/// inactive.
pub fn quote<C: Catalog + ?Sized>(
    catalog: &mut C,
    lines: &[CartLine],
) -> Result<PricedCart, DomainError> {
    let mut verified = Vec::with_capacity(lines.len());
    for line in lines {
        let product = catalog
            .active_product(line.product_id)?
            .filter(|p| p.is_active)
            .ok_or(DomainError::ProductUnavailable {
                product_id: line.product_id,
            })?;
        verified.push(VerifiedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: product.price,
        });
    }
    let total: BigDecimal = verified.iter().map(VerifiedLine::subtotal).sum();
    if total > max_amount() {
        return Err(DomainError::Validation(format!(
            "order total {} exceeds {}",
            total,
            max_amount()
        )));
    }
    Ok(PricedCart {
        lines: verified,
        total,
    })
}

/// Prices the cart and rejects it when the asserted total is off by more
/// than one minor unit.
pub fn verify<C: Catalog + ?Sized>(
    catalog: &mut C,
    lines: &[CartLine],
    asserted_total: &BigDecimal,
) -> Result<PricedCart, DomainError> {
    check_amount(asserted_total)?;
    let priced = quote(catalog, lines)?;
    if (&priced.total - asserted_total).abs() > price_tolerance() {
        return Err(DomainError::PriceMismatch {
            expected: priced.total,
            asserted: asserted_total.clone(),
        });
    }
    Ok(priced)
}
