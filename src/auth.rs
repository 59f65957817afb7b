//! Capability checks for privileged ledger operations

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Accountant,
    Staff,
}

/// Operations that require an explicit grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    ClosePeriod,
    ReopenPeriod,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::ClosePeriod => f.write_str("close_period"),
            Capability::ReopenPeriod => f.write_str("reopen_period"),
        }
    }
}

/// The acting user, as supplied by the identity layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Decides whether an actor holds a capability
pub trait Authorizer: Send + Sync {
    fn authorize(&self, actor: &Actor, capability: Capability) -> LedgerResult<()>;
}

/// Admins hold every capability; accountants may close periods but not reopen them
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn authorize(&self, actor: &Actor, capability: Capability) -> LedgerResult<()> {
        let allowed = actor.has_role(Role::Admin)
            || (capability == Capability::ClosePeriod && actor.has_role(Role::Accountant));
        if allowed {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                actor: actor.user_id.clone(),
                capability: capability.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_grants() {
        let auth = RoleAuthorizer;
        let admin = Actor::new("root", vec![Role::Admin]);
        let accountant = Actor::new("ani", vec![Role::Accountant]);
        let staff = Actor::new("budi", vec![Role::Staff]);

        assert!(auth.authorize(&admin, Capability::ReopenPeriod).is_ok());
        assert!(auth.authorize(&accountant, Capability::ClosePeriod).is_ok());
        assert!(matches!(
            auth.authorize(&accountant, Capability::ReopenPeriod),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(auth.authorize(&staff, Capability::ClosePeriod).is_err());
    }
}
