//! The authorization query catalog and its parameter sampling.
//!
//! Each entry is a Zanzibar-style question asked of the loaded graph: a
//! direct check, a check through group membership, listings, and reverse
//! lookups. Parameters are drawn from a seeded sample of ids read back from
//! the store, so two runs over the same database ask the same questions.

use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::Result;
use crate::store::{GraphStore, QueryParams, ResultRow, Value};

/// Which ids a query is parameterized by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    /// `:user_id` and `:resource_id`.
    UserAndResource,
    /// `:user_id`.
    User,
    /// `:resource_id`.
    Resource,
}

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySpec {
    /// Human-readable name, also the key for cross-run comparison.
    pub name: &'static str,
    /// SQL text with named parameters.
    pub sql: &'static str,
    /// Parameters the query takes.
    pub shape: ParamShape,
    /// Number of parameter sets drawn, i.e. measured iterations.
    pub iterations: usize,
}

const CATALOG: &[QuerySpec] = &[
    QuerySpec {
        name: "Direct Permission Check (Read)",
        sql: r#"SELECT u.id, r.id
FROM "User" u
JOIN "HAS_PERMISSION_USER" p ON p."from" = u.id
JOIN "Resource" r ON r.id = p."to"
WHERE u.id = :user_id AND r.id = :resource_id AND p.can_read = 1"#,
        shape: ParamShape::UserAndResource,
        iterations: 50,
    },
    QuerySpec {
        name: "Group-Based Permission Check",
        sql: r#"SELECT u.id, g.id, r.id
FROM "User" u
JOIN "MEMBER_OF" m ON m."from" = u.id
JOIN "UserGroup" g ON g.id = m."to"
JOIN "HAS_PERMISSION_GROUP" p ON p."from" = g.id
JOIN "Resource" r ON r.id = p."to"
WHERE u.id = :user_id AND r.id = :resource_id AND p.can_read = 1"#,
        shape: ParamShape::UserAndResource,
        iterations: 50,
    },
    QuerySpec {
        name: "Combined Permission Check (Direct + Group)",
        sql: r#"SELECT u.id, r.id
FROM "User" u, "Resource" r
WHERE u.id = :user_id AND r.id = :resource_id
  AND (
    EXISTS (SELECT 1 FROM "HAS_PERMISSION_USER" p1
            WHERE p1."from" = u.id AND p1."to" = r.id AND p1.can_read = 1)
    OR EXISTS (SELECT 1 FROM "MEMBER_OF" m
               JOIN "HAS_PERMISSION_GROUP" p2 ON p2."from" = m."to"
               WHERE m."from" = u.id AND p2."to" = r.id AND p2.can_read = 1)
  )"#,
        shape: ParamShape::UserAndResource,
        iterations: 50,
    },
    QuerySpec {
        name: "List User's Readable Resources",
        sql: r#"SELECT r.id, r.type, r.name
FROM "HAS_PERMISSION_USER" p
JOIN "Resource" r ON r.id = p."to"
WHERE p."from" = :user_id AND p.can_read = 1"#,
        shape: ParamShape::User,
        iterations: 30,
    },
    QuerySpec {
        name: "List User's Readable Resources (Via Groups)",
        sql: r#"SELECT DISTINCT r.id, r.type, r.name
FROM "MEMBER_OF" m
JOIN "HAS_PERMISSION_GROUP" p ON p."from" = m."to"
JOIN "Resource" r ON r.id = p."to"
WHERE m."from" = :user_id AND p.can_read = 1"#,
        shape: ParamShape::User,
        iterations: 30,
    },
    QuerySpec {
        name: "User's Groups (Direct Membership)",
        sql: r#"SELECT g.id, g.name
FROM "MEMBER_OF" m
JOIN "UserGroup" g ON g.id = m."to"
WHERE m."from" = :user_id"#,
        shape: ParamShape::User,
        iterations: 30,
    },
    QuerySpec {
        name: "Who Can Read Resource (Direct)",
        sql: r#"SELECT u.id, u.name
FROM "HAS_PERMISSION_USER" p
JOIN "User" u ON u.id = p."from"
WHERE p."to" = :resource_id AND p.can_read = 1"#,
        shape: ParamShape::Resource,
        iterations: 30,
    },
    QuerySpec {
        name: "Which Groups Can Read Resource",
        sql: r#"SELECT g.id, g.name
FROM "HAS_PERMISSION_GROUP" p
JOIN "UserGroup" g ON g.id = p."from"
WHERE p."to" = :resource_id AND p.can_read = 1"#,
        shape: ParamShape::Resource,
        iterations: 30,
    },
    QuerySpec {
        name: "Get All Permissions (User on Resource)",
        sql: r#"SELECT p.can_create, p.can_read, p.can_update, p.can_delete
FROM "HAS_PERMISSION_USER" p
WHERE p."from" = :user_id AND p."to" = :resource_id"#,
        shape: ParamShape::UserAndResource,
        iterations: 30,
    },
    QuerySpec {
        name: "Count User's Resources by Permission",
        sql: r#"SELECT
  SUM(CASE WHEN p.can_create THEN 1 ELSE 0 END) AS can_create_count,
  SUM(CASE WHEN p.can_read THEN 1 ELSE 0 END) AS can_read_count,
  SUM(CASE WHEN p.can_update THEN 1 ELSE 0 END) AS can_update_count,
  SUM(CASE WHEN p.can_delete THEN 1 ELSE 0 END) AS can_delete_count
FROM "HAS_PERMISSION_USER" p
WHERE p."from" = :user_id"#,
        shape: ParamShape::User,
        iterations: 20,
    },
];

/// Every catalog query, in benchmark order.
pub fn catalog() -> &'static [QuerySpec] {
    CATALOG
}

/// Ids sampled from a loaded store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleIds {
    /// Sampled user ids.
    pub users: Vec<String>,
    /// Sampled resource ids.
    pub resources: Vec<String>,
    /// Sampled group ids.
    pub groups: Vec<String>,
}

const ID_SCAN_LIMIT: usize = 1_000;
const GROUP_SCAN_LIMIT: usize = 500;

impl SampleIds {
    /// Reads candidate ids back from `store` and keeps a seeded sample of at
    /// most `sample_size` users and resources, and half as many groups.
    pub fn load<S: GraphStore + ?Sized>(
        store: &mut S,
        sample_size: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<Self> {
        let users = scan_ids(store, "User", ID_SCAN_LIMIT)?;
        let resources = scan_ids(store, "Resource", ID_SCAN_LIMIT)?;
        let groups = scan_ids(store, "UserGroup", GROUP_SCAN_LIMIT)?;
        let sample = Self {
            users: sample_without_replacement(rng, users, sample_size),
            resources: sample_without_replacement(rng, resources, sample_size),
            groups: sample_without_replacement(rng, groups, sample_size / 2),
        };
        debug!(
            users = sample.users.len(),
            resources = sample.resources.len(),
            groups = sample.groups.len(),
            "bench.query.sample_loaded"
        );
        Ok(sample)
    }
}

fn scan_ids<S: GraphStore + ?Sized>(store: &mut S, table: &str, limit: usize) -> Result<Vec<String>> {
    let sql = format!("SELECT id FROM \"{table}\" LIMIT {limit}");
    let mut ids = Vec::new();
    store.query(&sql, &QueryParams::new(), &mut |row: &ResultRow| {
        if let Some(Value::Text(id)) = row.first() {
            ids.push(id.clone());
        }
    })?;
    Ok(ids)
}

fn sample_without_replacement(rng: &mut ChaCha8Rng, pool: Vec<String>, wanted: usize) -> Vec<String> {
    let picked = index::sample(rng, pool.len(), wanted.min(pool.len()));
    picked.into_iter().map(|i| pool[i].clone()).collect()
}

/// Draws `spec.iterations` parameter sets, with replacement, from `ids`.
///
/// Returns an empty list when any id pool the query needs is empty; the
/// runner records such a query as skipped.
pub fn generate_params(spec: &QuerySpec, ids: &SampleIds, rng: &mut ChaCha8Rng) -> Vec<QueryParams> {
    let needs_users = matches!(spec.shape, ParamShape::UserAndResource | ParamShape::User);
    let needs_resources = matches!(spec.shape, ParamShape::UserAndResource | ParamShape::Resource);
    if (needs_users && ids.users.is_empty()) || (needs_resources && ids.resources.is_empty()) {
        return Vec::new();
    }
    (0..spec.iterations)
        .filter_map(|_| {
            let mut params = QueryParams::new();
            if needs_users {
                params.insert("user_id".into(), ids.users.choose(&mut *rng)?.clone());
            }
            if needs_resources {
                params.insert("resource_id".into(), ids.resources.choose(&mut *rng)?.clone());
            }
            Some(params)
        })
        .collect()
}

/// Seeded RNG for parameter sampling.
pub fn params_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
