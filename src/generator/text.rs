//! Word-table text faker driven by a caller-supplied RNG.
//!
//! Nothing here owns randomness: every function takes the RNG of the stream
//! being generated, so output depends only on the seed of that stream.

use rand::seq::SliceRandom;
use rand::Rng;

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Chen", "Dana", "Elif", "Farah", "Gustavo", "Hana", "Ivan", "Jonas",
    "Keiko", "Liam", "Maya", "Nadia", "Omar", "Priya", "Quinn", "Rosa", "Sven", "Tariq",
    "Uma", "Viktor", "Wen", "Ximena", "Yusuf", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Anderson", "Barros", "Castillo", "Dubois", "Eriksen", "Fischer", "Garcia", "Hoffmann",
    "Ito", "Jensen", "Kowalski", "Lindqvist", "Moreau", "Nakamura", "Okafor", "Petrov",
    "Rossi", "Schmidt", "Tanaka", "Urbina", "Vasquez", "Weber", "Yamada", "Zhang",
];

const EMAIL_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "mail.test",
    "corp.test",
];

const WORDS: &[&str] = &[
    "alpha", "anchor", "beacon", "border", "canvas", "cipher", "delta", "ember", "fabric",
    "falcon", "garden", "harbor", "horizon", "island", "jigsaw", "kernel", "lantern", "ledger",
    "matrix", "meadow", "nebula", "orbit", "parcel", "prism", "quartz", "radar", "river",
    "signal", "summit", "thread", "tundra", "vector", "willow", "yonder", "zenith",
];

const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Group", "Labs", "Systems", "Partners"];

const CATCH_ADJECTIVES: &[&str] = &[
    "Adaptive", "Balanced", "Centralized", "Distributed", "Enhanced", "Focused", "Integrated",
    "Proactive", "Scalable", "Secure",
];

const CATCH_NOUNS: &[&str] = &[
    "architecture", "framework", "initiative", "interface", "platform", "pipeline", "protocol",
    "strategy", "toolset", "workflow",
];

const BS_VERBS: &[&str] = &[
    "aggregate", "architect", "deliver", "empower", "enable", "harness", "orchestrate",
    "streamline", "synthesize", "transform",
];

const BS_ADJECTIVES: &[&str] = &[
    "cross-platform", "end-to-end", "frictionless", "granular", "mission-critical",
    "real-time", "robust", "seamless", "turnkey", "vertical",
];

const BS_NOUNS: &[&str] = &[
    "channels", "deliverables", "experiences", "infrastructures", "markets", "metrics",
    "networks", "paradigms", "solutions", "synergies",
];

const JOBS: &[&str] = &[
    "Accountant", "Architect", "Data scientist", "Designer", "Engineer", "Lawyer",
    "Product manager", "Recruiter", "Sales manager", "Support specialist",
];

const CITIES: &[&str] = &[
    "Amsterdam", "Austin", "Berlin", "Bogota", "Cairo", "Lagos", "Lisbon", "Melbourne",
    "Montreal", "Osaka", "Seoul", "Toronto",
];

/// Departments used for group names.
pub const DEPARTMENTS: &[&str] = &[
    "Engineering",
    "Sales",
    "Marketing",
    "HR",
    "Finance",
    "Operations",
];

/// Teams appended to a department for nested group names.
pub const TEAMS: &[&str] = &[
    "Alpha",
    "Beta",
    "Gamma",
    "Delta",
    "Core",
    "Platform",
    "Infrastructure",
];

fn pick<R: Rng + ?Sized>(rng: &mut R, table: &'static [&'static str]) -> &'static str {
    table.choose(rng).copied().unwrap_or_default()
}

/// Lowercase dictionary word.
pub fn word<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, WORDS)
}

/// "First Last".
pub fn person_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

/// Email address shaped like `first.last42@domain`.
pub fn email<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = pick(rng, FIRST_NAMES).to_ascii_lowercase();
    let last = pick(rng, LAST_NAMES).to_ascii_lowercase();
    let n: u16 = rng.gen_range(1..1000);
    format!("{first}.{last}{n}@{}", pick(rng, EMAIL_DOMAINS))
}

/// Word with its first letter uppercased.
pub fn capitalized_word<R: Rng + ?Sized>(rng: &mut R) -> String {
    let w = word(rng);
    let mut chars = w.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `word.ext`.
pub fn file_name<R: Rng + ?Sized>(rng: &mut R, extension: &str) -> String {
    format!("{}.{extension}", word(rng))
}

/// "Lastname Suffix".
pub fn company<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, LAST_NAMES), pick(rng, COMPANY_SUFFIXES))
}

/// Two-word marketing phrase.
pub fn catch_phrase<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, CATCH_ADJECTIVES), pick(rng, CATCH_NOUNS))
}

/// Three-word business jargon.
pub fn bs<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{} {} {}",
        pick(rng, BS_VERBS),
        pick(rng, BS_ADJECTIVES),
        pick(rng, BS_NOUNS)
    )
}

/// Job title.
pub fn job<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, JOBS)
}

/// City name.
pub fn city<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, CITIES)
}

/// Department name.
pub fn department<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, DEPARTMENTS)
}

/// Team name.
pub fn team<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, TEAMS)
}
