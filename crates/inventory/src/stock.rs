//! Stock arithmetic for the sale paths.

use tillsync_core::LedgerError;

use crate::policy::ShortagePolicy;

/// Outcome of planning a stock decrement for a sale (or a sale-growth delta).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalePlan {
    /// Stock counter after the decrement, clamped to zero on the
    /// permissive shortage path.
    pub new_stock: i64,
    /// The decrement exceeded available stock and was let through.
    pub shortage: bool,
}

/// Decide the new stock level for taking `quantity` units out of
/// `available`.
///
/// Strict policy fails with the available/requested pair and plans no
/// write. Permissive policy clamps to zero and flags the shortage; the
/// caller records the full requested quantity on the audit movement.
pub fn plan_sale(
    available: i64,
    quantity: i64,
    policy: ShortagePolicy,
) -> Result<SalePlan, LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::validation("quantity must be positive"));
    }

    if quantity > available {
        match policy {
            ShortagePolicy::Strict => Err(LedgerError::InsufficientStock {
                available,
                requested: quantity,
            }),
            ShortagePolicy::Permissive => Ok(SalePlan {
                new_stock: (available - quantity).max(0),
                shortage: true,
            }),
        }
    } else {
        Ok(SalePlan {
            new_stock: available - quantity,
            shortage: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_stock_sells_out_cleanly() {
        let plan = plan_sale(5, 5, ShortagePolicy::Strict).unwrap();
        assert_eq!(plan.new_stock, 0);
        assert!(!plan.shortage);
    }

    #[test]
    fn strict_shortage_fails_with_both_quantities() {
        let err = plan_sale(2, 4, ShortagePolicy::Strict).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available: 2,
                requested: 4
            }
        );
    }

    #[test]
    fn permissive_shortage_clamps_to_zero() {
        let plan = plan_sale(3, 10, ShortagePolicy::Permissive).unwrap();
        assert_eq!(plan.new_stock, 0);
        assert!(plan.shortage);
    }

    proptest! {
        #[test]
        fn planned_stock_is_never_negative(
            available in 0i64..1_000_000,
            quantity in 1i64..1_000_000,
        ) {
            for policy in [ShortagePolicy::Strict, ShortagePolicy::Permissive] {
                if let Ok(plan) = plan_sale(available, quantity, policy) {
                    prop_assert!(plan.new_stock >= 0);
                }
            }
        }

        #[test]
        fn sufficient_stock_behaves_identically_under_both_policies(
            available in 0i64..1_000_000,
            quantity in 1i64..1_000_000,
        ) {
            prop_assume!(quantity <= available);
            let strict = plan_sale(available, quantity, ShortagePolicy::Strict).unwrap();
            let permissive = plan_sale(available, quantity, ShortagePolicy::Permissive).unwrap();
            prop_assert_eq!(strict, permissive);
            prop_assert_eq!(strict.new_stock, available - quantity);
            prop_assert!(!strict.shortage);
        }
    }
}
