use std::collections::BTreeMap;

use super::errors::DomainError;
use super::ports::StockLedger;
use super::pricing::VerifiedLine;

/// Units wanted per product, keyed in ascending product id.
pub fn per_product<I>(lines: I) -> Result<BTreeMap<i32, i32>, DomainError>
where
    I: IntoIterator<Item = (i32, i32)>,
{
    let mut wanted: BTreeMap<i32, i32> = BTreeMap::new();
    for (product_id, quantity) in lines {
        let total = wanted.entry(product_id).or_default();
        *total = total.checked_add(quantity).ok_or_else(|| {
            DomainError::Validation(format!("quantity for product {product_id} is too large"))
        })?;
    }
    Ok(wanted)
}

/// Read-only availability check done at placement. Stock is not held: the
/// decrement on payment re-checks atomically.
pub fn reserve<L: StockLedger + ?Sized>(
    ledger: &mut L,
    lines: &[VerifiedLine],
) -> Result<(), DomainError> {
    let wanted = per_product(lines.iter().map(|l| (l.product_id, l.quantity)))?;
    for (product_id, requested) in wanted {
        let available = ledger
            .available(product_id)?
            .ok_or(DomainError::ProductUnavailable { product_id })?;
        if available < requested {
            return Err(DomainError::InsufficientStock {
                product_id,
                requested,
            });
        }
    }
    Ok(())
}

/// Decrements stock once per product, in ascending product id, stopping at
/// the first failure. Concurrent payments therefore lock product rows in the
/// same order. The caller owns the transaction and rolls back on error.
pub fn commit_stock<L, I>(ledger: &mut L, lines: I) -> Result<(), DomainError>
where
    L: StockLedger + ?Sized,
    I: IntoIterator<Item = (i32, i32)>,
{
    for (product_id, quantity) in per_product(lines)? {
        ledger.decrement(product_id, quantity)?;
    }
    Ok(())
}
