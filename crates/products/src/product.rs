use serde::{Deserialize, Serialize};

use tillsync_core::{LedgerError, ProductCode};

/// Product row as held by the ledger store.
///
/// `current_stock` is the only contended field in the system. It is mutated
/// exclusively inside a store transaction (sale executor, mutation service,
/// or an explicit inventory movement), never by UI forms during a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    code: ProductCode,
    name: String,
    current_stock: i64,
    min_stock_level: i64,
    /// Price in smallest currency unit (e.g., cents).
    cost_price: u64,
    /// Price in smallest currency unit (e.g., cents).
    unit_price: u64,
}

impl Product {
    pub fn new(
        code: ProductCode,
        name: impl Into<String>,
        current_stock: i64,
        min_stock_level: i64,
        cost_price: u64,
        unit_price: u64,
    ) -> Result<Self, LedgerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LedgerError::validation("product name cannot be empty"));
        }
        if current_stock < 0 {
            return Err(LedgerError::validation("current stock cannot be negative"));
        }
        if min_stock_level < 0 {
            return Err(LedgerError::validation(
                "minimum stock level cannot be negative",
            ));
        }
        Ok(Self {
            code,
            name,
            current_stock,
            min_stock_level,
            cost_price,
            unit_price,
        })
    }

    pub fn code(&self) -> &ProductCode {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_stock(&self) -> i64 {
        self.current_stock
    }

    pub fn min_stock_level(&self) -> i64 {
        self.min_stock_level
    }

    pub fn cost_price(&self) -> u64 {
        self.cost_price
    }

    pub fn unit_price(&self) -> u64 {
        self.unit_price
    }

    /// Copy of this row with the stock counter replaced.
    ///
    /// Negative values are rejected: the permissive shortage path clamps to
    /// zero before calling this, so a negative here is a caller bug.
    pub fn with_current_stock(&self, current_stock: i64) -> Result<Self, LedgerError> {
        if current_stock < 0 {
            return Err(LedgerError::validation("current stock cannot be negative"));
        }
        Ok(Self {
            current_stock,
            ..self.clone()
        })
    }

    /// Low-stock indicator for dashboards.
    pub fn is_below_min_stock(&self) -> bool {
        self.current_stock < self.min_stock_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> ProductCode {
        ProductCode::new(s).unwrap()
    }

    #[test]
    fn rejects_negative_stock_on_construction() {
        let err = Product::new(code("P1"), "Box", -1, 0, 100, 150).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn rejects_empty_name() {
        assert!(Product::new(code("P1"), "  ", 5, 0, 100, 150).is_err());
    }

    #[test]
    fn with_current_stock_replaces_only_the_counter() {
        let p = Product::new(code("P1"), "Box", 10, 2, 100, 150).unwrap();
        let p2 = p.with_current_stock(7).unwrap();
        assert_eq!(p2.current_stock(), 7);
        assert_eq!(p2.name(), p.name());
        assert_eq!(p2.unit_price(), p.unit_price());
        assert!(p.with_current_stock(-3).is_err());
    }

    #[test]
    fn below_min_stock_is_strict() {
        let p = Product::new(code("P1"), "Box", 2, 2, 100, 150).unwrap();
        assert!(!p.is_below_min_stock());
        assert!(p.with_current_stock(1).unwrap().is_below_min_stock());
    }
}
