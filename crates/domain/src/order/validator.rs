//! Cart validation against live catalog snapshots.
//!
//! The per-line check is a pure function over one catalog entry; the async
//! wrapper only performs the lookups. Validation runs on every placement and
//! its results are never cached.

use common::{ProductId, UserId};
use document_store::Version;
use serde::{Deserialize, Serialize};

use super::OrderError;
use crate::catalog::{CatalogEntry, CatalogLookup};
use crate::error::DomainError;
use crate::value_objects::Money;

/// A line as submitted by the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,

    /// Price the client believes applies. Informational only.
    #[serde(default)]
    pub claimed_price: Option<Money>,
}

impl CartLine {
    /// Creates a cart line without a claimed price.
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
            claimed_price: None,
        }
    }

    /// Sets the price the client claims.
    pub fn with_claimed_price(mut self, price: Money) -> Self {
        self.claimed_price = Some(price);
        self
    }
}

/// A cart line normalized against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub title: String,
    pub producer_id: UserId,
    pub quantity: u32,

    /// Authoritative price from the catalog.
    pub unit_price: Money,

    /// Catalog version the line was checked against.
    pub catalog_version: Version,
}

impl PricedLine {
    /// Returns `unit_price * quantity`, or None if it overflows.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// The outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCart {
    lines: Vec<PricedLine>,
    grand_total: Money,
}

impl ValidatedCart {
    /// Builds a validated cart, computing the grand total.
    ///
    /// Fails with [`OrderError::AmountOverflow`] naming the first line whose
    /// total, or whose addition to the running total, does not fit.
    pub fn new(lines: Vec<PricedLine>) -> Result<Self, OrderError> {
        let mut grand_total = Money::zero();
        for line in &lines {
            grand_total = line
                .line_total()
                .and_then(|total| grand_total.checked_add(total))
                .ok_or(OrderError::AmountOverflow {
                    product_id: line.product_id,
                })?;
        }
        Ok(Self { lines, grand_total })
    }

    /// Returns the normalized lines in cart order.
    pub fn lines(&self) -> &[PricedLine] {
        &self.lines
    }

    /// Returns Σ(unit price × quantity).
    pub fn grand_total(&self) -> Money {
        self.grand_total
    }

    /// Returns the quantity to take per product, summing repeated products,
    /// with the catalog version each was validated at. First-seen order.
    pub fn stock_demand(&self) -> Vec<(ProductId, u32, Version)> {
        let mut demand: Vec<(ProductId, u32, Version)> = Vec::new();
        for line in &self.lines {
            match demand.iter_mut().find(|(id, _, _)| *id == line.product_id) {
                Some((_, quantity, _)) => *quantity = quantity.saturating_add(line.quantity),
                None => demand.push((line.product_id, line.quantity, line.catalog_version)),
            }
        }
        demand
    }
}

/// Checks one line against the catalog entry it references.
///
/// Each line is checked on its own, so a cart repeating a product passes as
/// long as every individual line fits the stock.
pub fn check_line(line: &CartLine, entry: Option<&CatalogEntry>) -> Result<PricedLine, OrderError> {
    if line.quantity == 0 {
        return Err(OrderError::InvalidQuantity {
            product_id: line.product_id,
            quantity: line.quantity,
        });
    }

    let entry = entry.ok_or(OrderError::ProductNotFound {
        product_id: line.product_id,
    })?;

    if !entry.can_supply(line.quantity) {
        return Err(OrderError::InsufficientStock {
            product_id: entry.id,
            title: entry.title.clone(),
            requested: line.quantity,
            available: entry.available_quantity,
        });
    }

    if let Some(claimed) = line.claimed_price
        && claimed != entry.price
    {
        tracing::debug!(
            product_id = %entry.id,
            %claimed,
            actual = %entry.price,
            "ignoring client price"
        );
    }

    if entry.price.checked_mul(line.quantity).is_none() {
        return Err(OrderError::AmountOverflow { product_id: entry.id });
    }

    Ok(PricedLine {
        product_id: entry.id,
        title: entry.title.clone(),
        producer_id: entry.owner_id,
        quantity: line.quantity,
        unit_price: entry.price,
        catalog_version: entry.version,
    })
}

/// Validates a cart against the current catalog.
///
/// Stops at the first failing line.
pub async fn validate_cart<C>(catalog: &C, lines: &[CartLine]) -> Result<ValidatedCart, DomainError>
where
    C: CatalogLookup + ?Sized,
{
    if lines.is_empty() {
        return Err(OrderError::EmptyCart.into());
    }

    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        let entry = if line.quantity == 0 {
            None
        } else {
            catalog.get_product(line.product_id).await?
        };
        priced.push(check_line(line, entry.as_ref())?);
    }

    Ok(ValidatedCart::new(priced)?)
}
