#![forbid(unsafe_code)]

//! Synthetic authorization graph generation.
//!
//! The generator produces users, resources and groups, then the edges that
//! connect them: memberships, direct and group permissions, and group
//! inheritance. Every random choice is drawn from a ChaCha8 stream derived
//! from the explicit seed held by [`GenerationContext`], so the same
//! configuration always yields the same graph.

mod edges;
mod entities;
mod graph;
mod model;
pub mod text;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use edges::{EdgeGenerator, GROUP_FLAG_ODDS, USER_FLAG_ODDS};
pub use entities::{
    entity_id, group_id, resource_id, user_id, Entities, Entity, EntityEnv, OWNER_POOL,
};
pub use graph::AuthGraph;
pub use model::{
    Capabilities, Group, GroupPermission, Inheritance, Membership, Record, RecordKind, Resource,
    ResourceType, Role, Timestamp, User, UserPermission,
};

use crate::error::{BenchError, Result};

/// Default seed of a generation run.
pub const DEFAULT_SEED: u64 = 42;
/// Default "now" of a generation run: 2025-01-01T00:00:00Z.
pub const DEFAULT_ANCHOR: Timestamp = Timestamp::from_unix(1_735_689_600);
/// Default length of the creation-time window, in days.
pub const DEFAULT_HISTORY_DAYS: u32 = 730;
/// Default probability that a second-half group inherits from a first-half group.
pub const DEFAULT_INHERITANCE_PROBABILITY: f64 = 0.3;

/// Independent RNG streams of one seed, one per record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngStream {
    /// User nodes.
    Users = 1,
    /// Resource nodes.
    Resources = 2,
    /// Group nodes.
    Groups = 3,
    /// Membership edges.
    MemberOf = 4,
    /// User permission edges.
    UserPermissions = 5,
    /// Group permission edges.
    GroupPermissions = 6,
    /// Inheritance edges.
    InheritsFrom = 7,
}

pub(crate) fn stream_rng(seed: u64, stream: RngStream) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream as u64);
    rng
}

/// Size and density knobs of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Number of users.
    pub users: usize,
    /// Number of resources.
    pub resources: usize,
    /// Number of groups.
    pub groups: usize,
    /// Seed of every RNG stream.
    pub seed: u64,
    /// Upper bound of every generated timestamp.
    pub anchor: Timestamp,
    /// Width of the creation-time window ending at `anchor`.
    pub history_days: u32,
    /// Probability that a candidate child group inherits from a parent.
    pub inheritance_probability: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            users: 5_000,
            resources: 3_000,
            groups: 500,
            seed: DEFAULT_SEED,
            anchor: DEFAULT_ANCHOR,
            history_days: DEFAULT_HISTORY_DAYS,
            inheritance_probability: DEFAULT_INHERITANCE_PROBABILITY,
        }
    }
}

impl GenerationConfig {
    /// A small graph useful for tests and smoke runs.
    pub fn small() -> Self {
        Self {
            users: 200,
            resources: 120,
            groups: 24,
            ..Self::default()
        }
    }
}

/// Explicit state shared by every generator of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationContext {
    /// Seed of every RNG stream.
    pub seed: u64,
    /// Latest timestamp the run may produce.
    pub anchor: Timestamp,
    /// Width of the creation-time window, in seconds.
    pub history_secs: i64,
    /// Probability used by inheritance generation.
    pub inheritance_probability: f64,
}

impl GenerationContext {
    /// Validates `config` and derives the context.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.inheritance_probability) {
            return Err(BenchError::invalid(format!(
                "inheritance_probability must be within [0, 1], got {}",
                config.inheritance_probability
            )));
        }
        Ok(Self {
            seed: config.seed,
            anchor: config.anchor,
            history_secs: i64::from(config.history_days) * 86_400,
            inheritance_probability: config.inheritance_probability,
        })
    }

    /// Fresh RNG for `stream`.
    pub fn rng(&self, stream: RngStream) -> ChaCha8Rng {
        stream_rng(self.seed, stream)
    }

    /// Uniform creation time in `[anchor - history, anchor]`.
    pub fn creation_time<R: Rng + ?Sized>(&self, rng: &mut R) -> Timestamp {
        let end = self.anchor.unix();
        Timestamp::from_unix(rng.gen_range(end - self.history_secs..=end))
    }

    /// Uniform time in `[earliest, anchor]`; `earliest` itself when it is
    /// already past the anchor.
    pub fn time_after<R: Rng + ?Sized>(&self, rng: &mut R, earliest: Timestamp) -> Timestamp {
        let end = self.anchor.unix();
        if earliest.unix() >= end {
            return earliest;
        }
        Timestamp::from_unix(rng.gen_range(earliest.unix()..=end))
    }
}

/// Generates a complete graph: nodes first, then every edge kind.
pub fn generate(config: &GenerationConfig) -> Result<AuthGraph> {
    let ctx = GenerationContext::from_config(config)?;
    let env = EntityEnv::for_users(config.users);

    let users: Vec<User> = Entities::<User>::new(&ctx, config.users, env)?.collect();
    let resources: Vec<Resource> = Entities::<Resource>::new(&ctx, config.resources, env)?.collect();
    let groups: Vec<Group> = Entities::<Group>::new(&ctx, config.groups, env)?.collect();

    let edges = EdgeGenerator::new(&ctx);
    let memberships = edges.member_of(&users, &groups);
    let user_permissions = edges.user_permissions(&users, &resources);
    let group_permissions = edges.group_permissions(&groups, &resources);
    let inheritance = edges.inherits_from(&groups);

    let graph = AuthGraph {
        users,
        resources,
        groups,
        memberships,
        user_permissions,
        group_permissions,
        inheritance,
    };
    info!(
        seed = ctx.seed,
        users = graph.users.len(),
        resources = graph.resources.len(),
        groups = graph.groups.len(),
        member_of = graph.memberships.len(),
        user_permissions = graph.user_permissions.len(),
        group_permissions = graph.group_permissions.len(),
        inherits_from = graph.inheritance.len(),
        "generator.graph.completed"
    );
    Ok(graph)
}
