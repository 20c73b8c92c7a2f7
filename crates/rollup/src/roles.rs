use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::Address;
use glide_primitives::Role;
use parking_lot::RwLock;
use tracing::info;

use crate::collaborators::Authorizer;
use crate::config::RolesConfig;
use crate::error::RollupError;

#[derive(Debug)]
struct RoleState {
    admin: Address,
    grants: BTreeMap<Role, BTreeSet<Address>>,
}

/// In-process role table. The admin implicitly holds every role and is the
/// only address allowed to change the table.
#[derive(Debug)]
pub struct RoleRegistry {
    state: RwLock<RoleState>,
}

impl RoleRegistry {
    pub fn new(admin: Address) -> Self {
        Self {
            state: RwLock::new(RoleState {
                admin,
                grants: BTreeMap::new(),
            }),
        }
    }

    pub fn from_config(config: &RolesConfig) -> Self {
        let mut grants: BTreeMap<Role, BTreeSet<Address>> = BTreeMap::new();
        let seeded = [
            (Role::Operator, &config.operators),
            (Role::Verifier, &config.verifiers),
            (Role::Adjudicator, &config.adjudicators),
        ];
        for (role, holders) in seeded {
            grants.entry(role).or_default().extend(holders.iter().copied());
        }
        Self {
            state: RwLock::new(RoleState {
                admin: config.admin,
                grants,
            }),
        }
    }

    pub fn admin(&self) -> Address {
        self.state.read().admin
    }

    /// Explicit holders of `role`, not counting the admin.
    pub fn holders(&self, role: Role) -> Vec<Address> {
        self.state
            .read()
            .grants
            .get(&role)
            .map(|holders| holders.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn grant_role(&self, caller: Address, role: Role, address: Address) -> Result<(), RollupError> {
        let mut state = self.state.write();
        ensure_admin(&state, caller)?;
        if role == Role::Admin {
            return Err(RollupError::Unauthorized {
                address: caller,
                role,
            });
        }
        if state.grants.entry(role).or_default().insert(address) {
            info!(%address, %role, "Granted role");
        }
        Ok(())
    }

    pub fn revoke_role(&self, caller: Address, role: Role, address: Address) -> Result<(), RollupError> {
        let mut state = self.state.write();
        ensure_admin(&state, caller)?;
        if state
            .grants
            .get_mut(&role)
            .is_some_and(|holders| holders.remove(&address))
        {
            info!(%address, %role, "Revoked role");
        }
        Ok(())
    }

    pub fn change_admin(&self, caller: Address, new_admin: Address) -> Result<(), RollupError> {
        let mut state = self.state.write();
        ensure_admin(&state, caller)?;
        state.admin = new_admin;
        info!(old = %caller, new = %new_admin, "Changed admin");
        Ok(())
    }
}

fn ensure_admin(state: &RoleState, caller: Address) -> Result<(), RollupError> {
    if state.admin != caller {
        return Err(RollupError::Unauthorized {
            address: caller,
            role: Role::Admin,
        });
    }
    Ok(())
}

impl Authorizer for RoleRegistry {
    fn is_authorized(&self, address: &Address, role: Role) -> bool {
        let state = self.state.read();
        state.admin == *address
            || state
                .grants
                .get(&role)
                .is_some_and(|holders| holders.contains(address))
    }
}
