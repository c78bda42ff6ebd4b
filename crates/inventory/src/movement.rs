use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillsync_core::{MovementId, ProductCode, SaleId, UserId};

/// Direction/kind of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
    Adjustment,
}

/// What caused a movement.
///
/// Every sale creation, reversal or quantity edit produces exactly one
/// movement whose reference ties it back to the sale. `External` covers
/// entries from the inventory UI (deliveries, manual counts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ref")]
pub enum MovementReference {
    Sale(SaleId),
    SaleAdjustment(SaleId),
    SaleReversal(SaleId),
    External(String),
}

impl MovementReference {
    pub fn sale_id(&self) -> Option<SaleId> {
        match self {
            Self::Sale(id) | Self::SaleAdjustment(id) | Self::SaleReversal(id) => Some(*id),
            Self::External(_) => None,
        }
    }
}

/// Append-only audit row recording one change to a product's stock counter.
///
/// Never mutated after creation. For a shortage-permissive sale the row
/// keeps the full requested quantity (not the clamped decrement) with
/// `shortage = true`, so audits can reconstruct what was actually sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    id: MovementId,
    product_code: ProductCode,
    movement_type: MovementType,
    quantity: i64,
    /// Cost in smallest currency unit, when known (IN movements).
    unit_cost: Option<u64>,
    reference: MovementReference,
    notes: Option<String>,
    shortage: bool,
    user_id: UserId,
    timestamp: DateTime<Utc>,
}

impl StockMovement {
    /// OUT movement for a newly recorded sale.
    pub fn out_for_sale(
        product_code: ProductCode,
        sale_id: SaleId,
        quantity: i64,
        shortage: bool,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            product_code,
            movement_type: MovementType::Out,
            quantity,
            unit_cost: None,
            reference: MovementReference::Sale(sale_id),
            notes: None,
            shortage,
            user_id,
            timestamp,
        }
    }

    /// ADJUSTMENT movement for a sale-quantity edit. `quantity` is the
    /// signed stock delta the edit applied (negative when the sale grew).
    pub fn adjustment_for_sale(
        product_code: ProductCode,
        sale_id: SaleId,
        quantity: i64,
        shortage: bool,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            product_code,
            movement_type: MovementType::Adjustment,
            quantity,
            unit_cost: None,
            reference: MovementReference::SaleAdjustment(sale_id),
            notes: None,
            shortage,
            user_id,
            timestamp,
        }
    }

    /// IN movement restoring stock after a sale deletion.
    pub fn reversal_for_sale(
        product_code: ProductCode,
        sale_id: SaleId,
        quantity: i64,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            product_code,
            movement_type: MovementType::In,
            quantity,
            unit_cost: None,
            reference: MovementReference::SaleReversal(sale_id),
            notes: None,
            shortage: false,
            user_id,
            timestamp,
        }
    }

    /// Movement entered from the inventory UI (delivery, manual count).
    #[allow(clippy::too_many_arguments)]
    pub fn external(
        product_code: ProductCode,
        movement_type: MovementType,
        quantity: i64,
        unit_cost: Option<u64>,
        reference_number: impl Into<String>,
        notes: Option<String>,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            product_code,
            movement_type,
            quantity,
            unit_cost,
            reference: MovementReference::External(reference_number.into()),
            notes,
            shortage: false,
            user_id,
            timestamp,
        }
    }

    pub fn id(&self) -> MovementId {
        self.id
    }

    pub fn product_code(&self) -> &ProductCode {
        &self.product_code
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_cost(&self) -> Option<u64> {
        self.unit_cost
    }

    pub fn reference(&self) -> &MovementReference {
        &self.reference
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn is_shortage(&self) -> bool {
        self.shortage
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_movements_reference_their_sale() {
        let sale_id = SaleId::new();
        let code = ProductCode::new("P1").unwrap();
        let m = StockMovement::out_for_sale(
            code.clone(),
            sale_id,
            5,
            false,
            UserId::new(),
            Utc::now(),
        );
        assert_eq!(m.movement_type(), MovementType::Out);
        assert_eq!(m.reference().sale_id(), Some(sale_id));

        let r =
            StockMovement::reversal_for_sale(code, sale_id, 5, UserId::new(), Utc::now());
        assert_eq!(r.movement_type(), MovementType::In);
        assert_eq!(r.reference().sale_id(), Some(sale_id));
        assert!(!r.is_shortage());
    }

    #[test]
    fn external_movements_have_no_sale() {
        let m = StockMovement::external(
            ProductCode::new("P1").unwrap(),
            MovementType::In,
            40,
            Some(90),
            "GRN-1021",
            None,
            UserId::new(),
            Utc::now(),
        );
        assert_eq!(m.reference().sale_id(), None);
    }
}
