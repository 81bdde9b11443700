//! The generated graph and its invariant checks.

use std::collections::HashMap;

use serde::Serialize;

use super::model::{
    Group, GroupPermission, Inheritance, Membership, RecordKind, Resource, Timestamp, User,
    UserPermission,
};
use crate::error::{BenchError, Result};

/// Every node and edge of one generation run, in generation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthGraph {
    /// User nodes.
    pub users: Vec<User>,
    /// Resource nodes.
    pub resources: Vec<Resource>,
    /// Group nodes.
    pub groups: Vec<Group>,
    /// `MEMBER_OF` edges.
    pub memberships: Vec<Membership>,
    /// `HAS_PERMISSION_USER` edges.
    pub user_permissions: Vec<UserPermission>,
    /// `HAS_PERMISSION_GROUP` edges.
    pub group_permissions: Vec<GroupPermission>,
    /// `INHERITS_FROM` edges.
    pub inheritance: Vec<Inheritance>,
}

impl AuthGraph {
    /// Number of records of `kind`.
    pub fn len_of(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Users => self.users.len(),
            RecordKind::Resources => self.resources.len(),
            RecordKind::Groups => self.groups.len(),
            RecordKind::MemberOf => self.memberships.len(),
            RecordKind::UserPermissions => self.user_permissions.len(),
            RecordKind::GroupPermissions => self.group_permissions.len(),
            RecordKind::InheritsFrom => self.inheritance.len(),
        }
    }

    /// Total node count.
    pub fn node_count(&self) -> usize {
        self.users.len() + self.resources.len() + self.groups.len()
    }

    /// Total edge count.
    pub fn edge_count(&self) -> usize {
        self.memberships.len()
            + self.user_permissions.len()
            + self.group_permissions.len()
            + self.inheritance.len()
    }

    /// Re-checks the invariants the generator guarantees by construction.
    ///
    /// Reports the first violation found: an edge endpoint that is not a node
    /// of this graph, an edge older than one of its endpoints, an inheritance
    /// edge crossing the parent/child partition the wrong way, or an owner
    /// grant without full capabilities.
    pub fn verify(&self) -> Result<()> {
        let users: HashMap<&str, Timestamp> = self
            .users
            .iter()
            .map(|u| (u.id.as_str(), u.created_at))
            .collect();
        let resources: HashMap<&str, (Timestamp, &str)> = self
            .resources
            .iter()
            .map(|r| (r.id.as_str(), (r.created_at, r.owner_id.as_str())))
            .collect();
        let groups: HashMap<&str, (usize, Timestamp)> = self
            .groups
            .iter()
            .enumerate()
            .map(|(ordinal, g)| (g.id.as_str(), (ordinal, g.created_at)))
            .collect();

        for resource in &self.resources {
            if !users.contains_key(resource.owner_id.as_str()) {
                return Err(referential("OWNED_BY", &resource.id, &resource.owner_id));
            }
        }

        for edge in &self.memberships {
            let (Some(&user), Some(&(_, group))) = (
                users.get(edge.user_id.as_str()),
                groups.get(edge.group_id.as_str()),
            ) else {
                return Err(referential("MEMBER_OF", &edge.user_id, &edge.group_id));
            };
            ensure_after("MEMBER_OF", &edge.user_id, &edge.group_id, edge.joined_at, user, group)?;
        }

        for edge in &self.user_permissions {
            let (Some(&user), Some(&(resource, owner))) = (
                users.get(edge.user_id.as_str()),
                resources.get(edge.resource_id.as_str()),
            ) else {
                return Err(referential(
                    "HAS_PERMISSION_USER",
                    &edge.user_id,
                    &edge.resource_id,
                ));
            };
            ensure_after(
                "HAS_PERMISSION_USER",
                &edge.user_id,
                &edge.resource_id,
                edge.granted_at,
                user,
                resource,
            )?;
            if edge.user_id == owner && !edge.capabilities().is_full() {
                return Err(BenchError::InvariantViolation(format!(
                    "owner {} of {} lacks full capabilities",
                    edge.user_id, edge.resource_id
                )));
            }
        }

        for edge in &self.group_permissions {
            let (Some(&(_, group)), Some(&(resource, _))) = (
                groups.get(edge.group_id.as_str()),
                resources.get(edge.resource_id.as_str()),
            ) else {
                return Err(referential(
                    "HAS_PERMISSION_GROUP",
                    &edge.group_id,
                    &edge.resource_id,
                ));
            };
            ensure_after(
                "HAS_PERMISSION_GROUP",
                &edge.group_id,
                &edge.resource_id,
                edge.granted_at,
                group,
                resource,
            )?;
        }

        let split = self.groups.len() / 2;
        for edge in &self.inheritance {
            let (Some(&(child_ord, child)), Some(&(parent_ord, parent))) = (
                groups.get(edge.child_id.as_str()),
                groups.get(edge.parent_id.as_str()),
            ) else {
                return Err(referential("INHERITS_FROM", &edge.child_id, &edge.parent_id));
            };
            if child_ord < split || parent_ord >= split {
                return Err(BenchError::InvariantViolation(format!(
                    "inheritance {} -> {} crosses the parent/child partition",
                    edge.child_id, edge.parent_id
                )));
            }
            ensure_after(
                "INHERITS_FROM",
                &edge.child_id,
                &edge.parent_id,
                edge.created_at,
                child,
                parent,
            )?;
        }
        Ok(())
    }
}

fn referential(kind: &'static str, from: &str, to: &str) -> BenchError {
    BenchError::ReferentialViolation {
        kind,
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn ensure_after(
    kind: &str,
    from: &str,
    to: &str,
    at: Timestamp,
    from_created: Timestamp,
    to_created: Timestamp,
) -> Result<()> {
    if at < from_created || at < to_created {
        return Err(BenchError::TemporalViolation(format!(
            "{kind} edge {from} -> {to} at {at} precedes an endpoint ({from_created} / {to_created})"
        )));
    }
    Ok(())
}
