//! Lazy, restartable node sequences.

use std::marker::PhantomData;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

use super::model::{Group, Resource, ResourceType, User};
use super::text;
use super::{stream_rng, GenerationContext, RngStream};
use crate::error::{BenchError, Result};

/// Users eligible to own resources: the first `OWNER_POOL` user ordinals.
pub const OWNER_POOL: usize = 101;

/// Formats a zero-padded ordinal identifier such as `user_000042`.
pub fn entity_id(prefix: &str, width: usize, ordinal: usize) -> String {
    format!("{prefix}_{ordinal:0width$}")
}

/// Identifier of the user with the given ordinal.
pub fn user_id(ordinal: usize) -> String {
    entity_id(User::PREFIX, User::WIDTH, ordinal)
}

/// Identifier of the resource with the given ordinal.
pub fn resource_id(ordinal: usize) -> String {
    entity_id(Resource::PREFIX, Resource::WIDTH, ordinal)
}

/// Identifier of the group with the given ordinal.
pub fn group_id(ordinal: usize) -> String {
    entity_id(Group::PREFIX, Group::WIDTH, ordinal)
}

/// Per-sequence inputs that are not part of the generation context.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityEnv {
    /// Number of users resources may pick an owner from.
    pub owner_pool: usize,
}

impl EntityEnv {
    /// Environment for a run that generated `users` users.
    pub fn for_users(users: usize) -> Self {
        Self {
            owner_pool: users.min(OWNER_POOL),
        }
    }
}

/// A node kind that can be generated from an ordinal and a seeded RNG.
pub trait Entity: Sized {
    /// Identifier prefix.
    const PREFIX: &'static str;
    /// Zero padding of the identifier ordinal.
    const WIDTH: usize;
    /// RNG stream the kind draws from.
    const STREAM: RngStream;

    /// Rejects environments that cannot produce `count` records.
    fn validate(_count: usize, _env: &EntityEnv) -> Result<()> {
        Ok(())
    }

    /// Builds the record with identifier `id`.
    fn build(id: String, ctx: &GenerationContext, env: &EntityEnv, rng: &mut ChaCha8Rng) -> Self;
}

impl Entity for User {
    const PREFIX: &'static str = "user";
    const WIDTH: usize = 6;
    const STREAM: RngStream = RngStream::Users;

    fn build(id: String, ctx: &GenerationContext, _env: &EntityEnv, rng: &mut ChaCha8Rng) -> Self {
        let created_at = ctx.creation_time(rng);
        let name = text::person_name(rng);
        let email = text::email(rng);
        let metadata = json!({
            "department": text::job(rng),
            "location": text::city(rng),
        })
        .to_string();
        User {
            id,
            name,
            email,
            created_at,
            metadata,
        }
    }
}

impl Entity for Resource {
    const PREFIX: &'static str = "resource";
    const WIDTH: usize = 6;
    const STREAM: RngStream = RngStream::Resources;

    fn validate(count: usize, env: &EntityEnv) -> Result<()> {
        if count > 0 && env.owner_pool == 0 {
            return Err(BenchError::invalid(
                "resources require at least one user to act as owner",
            ));
        }
        Ok(())
    }

    fn build(id: String, ctx: &GenerationContext, env: &EntityEnv, rng: &mut ChaCha8Rng) -> Self {
        let kind = *ResourceType::ALL
            .choose(rng)
            .unwrap_or(&ResourceType::Document);
        let created_at = ctx.creation_time(rng);
        let name = match kind {
            ResourceType::Document => format!(
                "{} {}",
                text::capitalized_word(rng),
                text::file_name(rng, "pdf")
            ),
            ResourceType::Folder => format!("/{}/{}", text::word(rng), text::word(rng)),
            ResourceType::Project => {
                format!("{} - {}", text::company(rng), text::catch_phrase(rng))
            }
            ResourceType::ApiKey => format!("API Key - {}", text::word(rng)),
            ResourceType::Database => {
                format!("db_{}_{}", text::word(rng), rng.gen_range(1..=100))
            }
        };
        let owner_id = user_id(rng.gen_range(0..env.owner_pool));
        let metadata = json!({ "tags": [text::word(rng), text::word(rng)] }).to_string();
        Resource {
            id,
            kind,
            name,
            owner_id,
            created_at,
            metadata,
        }
    }
}

impl Entity for Group {
    const PREFIX: &'static str = "group";
    const WIDTH: usize = 4;
    const STREAM: RngStream = RngStream::Groups;

    fn build(id: String, ctx: &GenerationContext, _env: &EntityEnv, rng: &mut ChaCha8Rng) -> Self {
        let created_at = ctx.creation_time(rng);
        let name = if rng.gen_bool(0.3) {
            format!("{} - {}", text::department(rng), text::team(rng))
        } else {
            text::department(rng).to_string()
        };
        let description = text::bs(rng);
        let metadata = json!({ "level": rng.gen_range(1..=5) }).to_string();
        Group {
            id,
            name,
            description,
            created_at,
            metadata,
        }
    }
}

/// Lazy, finite sequence of `count` records of kind `K`.
///
/// Identifiers follow ordinal order starting at zero. The sequence owns its
/// RNG, so [`Entities::restart`] replays exactly the same records.
pub struct Entities<'a, K: Entity> {
    ctx: &'a GenerationContext,
    env: EntityEnv,
    seed: u64,
    count: usize,
    next: usize,
    rng: ChaCha8Rng,
    _kind: PhantomData<K>,
}

impl<'a, K: Entity> Entities<'a, K> {
    /// Creates a sequence seeded from `ctx`.
    pub fn new(ctx: &'a GenerationContext, count: usize, env: EntityEnv) -> Result<Self> {
        K::validate(count, &env)?;
        Ok(Self {
            ctx,
            env,
            seed: ctx.seed,
            count,
            next: 0,
            rng: stream_rng(ctx.seed, K::STREAM),
            _kind: PhantomData,
        })
    }

    /// Rewinds to the first record.
    pub fn restart(&mut self) {
        self.next = 0;
        self.rng = stream_rng(self.seed, K::STREAM);
    }

    /// Switches to a different seed and rewinds.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.restart();
    }

    /// Total number of records in the sequence.
    pub fn count_total(&self) -> usize {
        self.count
    }
}

impl<K: Entity> Iterator for Entities<'_, K> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        if self.next >= self.count {
            return None;
        }
        let id = entity_id(K::PREFIX, K::WIDTH, self.next);
        self.next += 1;
        Some(K::build(id, self.ctx, &self.env, &mut self.rng))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl<K: Entity> ExactSizeIterator for Entities<'_, K> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenerationConfig;

    fn ctx() -> GenerationContext {
        GenerationContext::from_config(&GenerationConfig::default()).unwrap()
    }

    #[test]
    fn ids_are_zero_padded_ordinals() {
        let ctx = ctx();
        let users: Vec<User> = Entities::new(&ctx, 3, EntityEnv::default())
            .unwrap()
            .collect();
        let ids: Vec<_> = users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["user_000000", "user_000001", "user_000002"]);
        assert_eq!(group_id(12), "group_0012");
        assert_eq!(resource_id(7), "resource_000007");
    }

    #[test]
    fn restart_replays_identical_records() {
        let ctx = ctx();
        let mut groups = Entities::<Group>::new(&ctx, 20, EntityEnv::default()).unwrap();
        let first: Vec<_> = groups.by_ref().collect();
        assert!(groups.next().is_none());
        groups.restart();
        let second: Vec<_> = groups.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn reseed_changes_output() {
        let ctx = ctx();
        let mut users = Entities::<User>::new(&ctx, 10, EntityEnv::default()).unwrap();
        let first: Vec<_> = users.by_ref().collect();
        users.reseed(ctx.seed + 1);
        let second: Vec<_> = users.collect();
        assert_eq!(first.len(), second.len());
        assert_ne!(first, second);
    }

    #[test]
    fn resources_without_owners_are_rejected() {
        let ctx = ctx();
        let err = Entities::<Resource>::new(&ctx, 1, EntityEnv::for_users(0));
        assert!(matches!(err, Err(BenchError::InvalidArgument(_))));
        assert!(Entities::<Resource>::new(&ctx, 0, EntityEnv::for_users(0)).is_ok());
    }

    #[test]
    fn owners_come_from_the_owner_pool() {
        let ctx = ctx();
        let env = EntityEnv::for_users(5_000);
        assert_eq!(env.owner_pool, OWNER_POOL);
        for resource in Entities::<Resource>::new(&ctx, 500, env).unwrap() {
            let ordinal: usize = resource.owner_id["user_".len()..].parse().unwrap();
            assert!(ordinal < OWNER_POOL);
        }
    }

    #[test]
    fn creation_times_fall_in_history_window() {
        let ctx = ctx();
        for user in Entities::<User>::new(&ctx, 200, EntityEnv::default()).unwrap() {
            assert!(user.created_at <= ctx.anchor);
            assert!(user.created_at.unix() >= ctx.anchor.unix() - ctx.history_secs);
        }
    }
}
