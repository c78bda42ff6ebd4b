use serde::{Deserialize, Serialize};

use tillsync_core::UserId;

use crate::Role;

/// Identity attached to one live connection/session.
///
/// This is an authorization boundary object: the external auth collaborator
/// resolves credentials to a `(user_id, role)` pair and the core treats it
/// as ground truth. It parameterizes the sale-visibility filter; it grants
/// nothing by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionIdentity {
    pub user_id: UserId,
    pub role: Role,
}

impl ConnectionIdentity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Visibility rule for sale records on the live feed.
    ///
    /// Tellers receive only their own sales; every other role receives all
    /// of them. Removal events are exempt: a client never holds a record it
    /// was not allowed to see, so pruning by id needs no filter.
    pub fn can_view_sale(&self, owner: UserId) -> bool {
        match self.role {
            Role::Teller => self.user_id == owner,
            Role::Admin | Role::Manager => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teller_sees_only_own_sales() {
        let me = UserId::new();
        let other = UserId::new();
        let teller = ConnectionIdentity::new(me, Role::Teller);
        assert!(teller.can_view_sale(me));
        assert!(!teller.can_view_sale(other));
    }

    #[test]
    fn admin_and_manager_see_everything() {
        let other = UserId::new();
        for role in [Role::Admin, Role::Manager] {
            let conn = ConnectionIdentity::new(UserId::new(), role);
            assert!(conn.can_view_sale(other));
        }
    }

    #[test]
    fn only_admin_may_change_policy() {
        assert!(Role::Admin.may_change_policy());
        assert!(!Role::Manager.may_change_policy());
        assert!(!Role::Teller.may_change_policy());
    }
}
