//! Edge generation over already-materialized node sequences.
//!
//! Edges only ever point at nodes passed in by the caller, and every edge
//! timestamp is drawn from `[max(endpoint created_at), anchor]`, so
//! referential integrity and temporal ordering hold by construction.

use rand::seq::{index, SliceRandom};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::model::{
    Capabilities, Group, GroupPermission, Inheritance, Membership, Resource, Role, User,
    UserPermission,
};
use super::{GenerationContext, RngStream};

/// Per-flag grant probabilities for non-owner users: create, read, update, delete.
pub const USER_FLAG_ODDS: [f64; 4] = [0.3, 0.9, 0.5, 0.2];
/// Per-flag grant probabilities for groups: create, read, update, delete.
pub const GROUP_FLAG_ODDS: [f64; 4] = [0.4, 0.95, 0.6, 0.3];

const MAX_MEMBERSHIPS_PER_USER: usize = 4;
const MAX_USER_GRANTS_PER_RESOURCE: usize = 5;
const MAX_GROUP_GRANTS_PER_RESOURCE: usize = 3;

/// Distinct indices into a pool of `pool` items; `wanted` is capped to the pool.
fn sample_capped(rng: &mut ChaCha8Rng, pool: usize, wanted: usize) -> index::IndexVec {
    index::sample(rng, pool, wanted.min(pool))
}

fn draw_flags(rng: &mut ChaCha8Rng, odds: &[f64; 4]) -> Capabilities {
    Capabilities {
        create: rng.gen_bool(odds[0]),
        read: rng.gen_bool(odds[1]),
        update: rng.gen_bool(odds[2]),
        delete: rng.gen_bool(odds[3]),
    }
}

/// Produces every edge kind from node slices of one run.
pub struct EdgeGenerator<'a> {
    ctx: &'a GenerationContext,
}

impl<'a> EdgeGenerator<'a> {
    /// Generator drawing from the streams of `ctx`.
    pub fn new(ctx: &'a GenerationContext) -> Self {
        Self { ctx }
    }

    /// `MEMBER_OF`: each user joins between one and four distinct groups.
    pub fn member_of(&self, users: &[User], groups: &[Group]) -> Vec<Membership> {
        let mut rng = self.ctx.rng(RngStream::MemberOf);
        let mut edges = Vec::with_capacity(users.len() * 2);
        if groups.is_empty() {
            return edges;
        }
        let max_fanout = MAX_MEMBERSHIPS_PER_USER.min(groups.len());
        for user in users {
            let fanout = rng.gen_range(1..=max_fanout);
            for idx in sample_capped(&mut rng, groups.len(), fanout) {
                let group = &groups[idx];
                let joined_at = self
                    .ctx
                    .time_after(&mut rng, user.created_at.max(group.created_at));
                let role = if rng.gen_ratio(1, 4) {
                    Role::Admin
                } else {
                    Role::Member
                };
                edges.push(Membership {
                    user_id: user.id.clone(),
                    group_id: group.id.clone(),
                    joined_at,
                    role,
                });
            }
        }
        edges
    }

    /// `HAS_PERMISSION_USER`: each resource grants one to five distinct users.
    ///
    /// The owner always receives full capabilities; other users draw each flag
    /// from [`USER_FLAG_ODDS`].
    pub fn user_permissions(&self, users: &[User], resources: &[Resource]) -> Vec<UserPermission> {
        let mut rng = self.ctx.rng(RngStream::UserPermissions);
        let mut edges = Vec::with_capacity(resources.len() * 3);
        if users.is_empty() {
            return edges;
        }
        for resource in resources {
            let grants = rng.gen_range(1..=MAX_USER_GRANTS_PER_RESOURCE);
            for idx in sample_capped(&mut rng, users.len(), grants) {
                let user = &users[idx];
                let granted_at = self
                    .ctx
                    .time_after(&mut rng, user.created_at.max(resource.created_at));
                let flags = if user.id == resource.owner_id {
                    Capabilities::FULL
                } else {
                    draw_flags(&mut rng, &USER_FLAG_ODDS)
                };
                edges.push(UserPermission {
                    user_id: user.id.clone(),
                    resource_id: resource.id.clone(),
                    can_create: flags.create,
                    can_read: flags.read,
                    can_update: flags.update,
                    can_delete: flags.delete,
                    granted_at,
                    granted_by: resource.owner_id.clone(),
                });
            }
        }
        edges
    }

    /// `HAS_PERMISSION_GROUP`: each resource grants zero to three distinct groups.
    pub fn group_permissions(
        &self,
        groups: &[Group],
        resources: &[Resource],
    ) -> Vec<GroupPermission> {
        let mut rng = self.ctx.rng(RngStream::GroupPermissions);
        let mut edges = Vec::with_capacity(resources.len() * 2);
        if groups.is_empty() {
            return edges;
        }
        for resource in resources {
            let grants = rng.gen_range(0..=MAX_GROUP_GRANTS_PER_RESOURCE);
            if grants == 0 {
                continue;
            }
            for idx in sample_capped(&mut rng, groups.len(), grants) {
                let group = &groups[idx];
                let granted_at = self
                    .ctx
                    .time_after(&mut rng, group.created_at.max(resource.created_at));
                let flags = draw_flags(&mut rng, &GROUP_FLAG_ODDS);
                edges.push(GroupPermission {
                    group_id: group.id.clone(),
                    resource_id: resource.id.clone(),
                    can_create: flags.create,
                    can_read: flags.read,
                    can_update: flags.update,
                    can_delete: flags.delete,
                    granted_at,
                    granted_by: resource.owner_id.clone(),
                });
            }
        }
        edges
    }

    /// `INHERITS_FROM`: children come from the second half of the group
    /// ordinals, parents from the first half.
    ///
    /// Every edge points from a higher ordinal to a strictly lower one, and no
    /// parent is ever a child, so the relation cannot contain a cycle.
    pub fn inherits_from(&self, groups: &[Group]) -> Vec<Inheritance> {
        let mut rng = self.ctx.rng(RngStream::InheritsFrom);
        let (parents, children) = groups.split_at(groups.len() / 2);
        let mut edges = Vec::new();
        if parents.is_empty() {
            return edges;
        }
        for child in children {
            if !rng.gen_bool(self.ctx.inheritance_probability) {
                continue;
            }
            let Some(parent) = parents.choose(&mut rng) else {
                continue;
            };
            let created_at = self
                .ctx
                .time_after(&mut rng, child.created_at.max(parent.created_at));
            edges.push(Inheritance {
                child_id: child.id.clone(),
                parent_id: parent.id.clone(),
                created_at,
            });
        }
        edges
    }
}
