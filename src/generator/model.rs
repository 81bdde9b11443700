//! Node and edge records, timestamps and record kinds.

use std::fmt;

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::{BenchError, Result};

/// Whole-second UTC timestamp, serialized as RFC 3339.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Builds a timestamp from seconds since the Unix epoch.
    pub const fn from_unix(secs: i64) -> Self {
        Timestamp(secs)
    }

    /// Seconds since the Unix epoch.
    pub const fn unix(self) -> i64 {
        self.0
    }

    /// Parses an RFC 3339 string, truncating sub-second precision.
    pub fn parse_rfc3339(value: &str) -> Result<Self> {
        let parsed = OffsetDateTime::parse(value, &Rfc3339)
            .map_err(|e| BenchError::invalid(format!("bad timestamp {value:?}: {e}")))?;
        Ok(Timestamp(parsed.unix_timestamp()))
    }

    /// Formats the timestamp as RFC 3339 in UTC.
    pub fn to_rfc3339(self) -> Result<String> {
        let dt = OffsetDateTime::from_unix_timestamp(self.0)
            .map_err(|e| BenchError::invalid(format!("timestamp {} out of range: {e}", self.0)))?;
        dt.format(&Rfc3339)
            .map_err(|e| BenchError::invalid(format!("timestamp {} not formattable: {e}", self.0)))
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(value: OffsetDateTime) -> Self {
        Timestamp(value.unix_timestamp())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "@{}", self.0),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let text = self.to_rfc3339().map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Timestamp::parse_rfc3339(&text).map_err(D::Error::custom)
    }
}

/// System user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// `user_000123`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Opaque JSON blob.
    pub metadata: String,
}

/// Kind of protected resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A document.
    Document,
    /// A folder.
    Folder,
    /// A project.
    Project,
    /// An API key.
    ApiKey,
    /// A database.
    Database,
}

impl ResourceType {
    /// Every resource type, in sampling order.
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Document,
        ResourceType::Folder,
        ResourceType::Project,
        ResourceType::ApiKey,
        ResourceType::Database,
    ];

    /// Serialized name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Document => "document",
            ResourceType::Folder => "folder",
            ResourceType::Project => "project",
            ResourceType::ApiKey => "api_key",
            ResourceType::Database => "database",
        }
    }
}

/// Protected resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// `resource_000123`.
    pub id: String,
    /// Resource kind.
    #[serde(rename = "type")]
    pub kind: ResourceType,
    /// Type-specific display name.
    pub name: String,
    /// Identifier of the owning user.
    pub owner_id: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Opaque JSON blob.
    pub metadata: String,
}

/// Group of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// `group_0123`.
    pub id: String,
    /// Department, optionally suffixed with a team.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Opaque JSON blob.
    pub metadata: String,
}

/// Role held by a member inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular member.
    Member,
    /// Group administrator.
    Admin,
}

/// CRUD capability flags carried by a permission edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// May create.
    pub create: bool,
    /// May read.
    pub read: bool,
    /// May update.
    pub update: bool,
    /// May delete.
    pub delete: bool,
}

impl Capabilities {
    /// All four flags set.
    pub const FULL: Capabilities = Capabilities {
        create: true,
        read: true,
        update: true,
        delete: true,
    };

    /// True when every flag is set.
    pub fn is_full(self) -> bool {
        self == Self::FULL
    }
}

/// `MEMBER_OF` edge, User -> Group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Member user id.
    #[serde(rename = "from")]
    pub user_id: String,
    /// Group id.
    #[serde(rename = "to")]
    pub group_id: String,
    /// Join time.
    pub joined_at: Timestamp,
    /// Role inside the group.
    pub role: Role,
}

/// `HAS_PERMISSION_USER` edge, User -> Resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermission {
    /// Grantee user id.
    #[serde(rename = "from")]
    pub user_id: String,
    /// Resource id.
    #[serde(rename = "to")]
    pub resource_id: String,
    /// Create flag.
    pub can_create: bool,
    /// Read flag.
    pub can_read: bool,
    /// Update flag.
    pub can_update: bool,
    /// Delete flag.
    pub can_delete: bool,
    /// Grant time.
    pub granted_at: Timestamp,
    /// User that granted the permission.
    pub granted_by: String,
}

/// `HAS_PERMISSION_GROUP` edge, Group -> Resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPermission {
    /// Grantee group id.
    #[serde(rename = "from")]
    pub group_id: String,
    /// Resource id.
    #[serde(rename = "to")]
    pub resource_id: String,
    /// Create flag.
    pub can_create: bool,
    /// Read flag.
    pub can_read: bool,
    /// Update flag.
    pub can_update: bool,
    /// Delete flag.
    pub can_delete: bool,
    /// Grant time.
    pub granted_at: Timestamp,
    /// User that granted the permission.
    pub granted_by: String,
}

macro_rules! impl_capabilities {
    ($ty:ty) => {
        impl $ty {
            /// Capability flags of this edge.
            pub fn capabilities(&self) -> Capabilities {
                Capabilities {
                    create: self.can_create,
                    read: self.can_read,
                    update: self.can_update,
                    delete: self.can_delete,
                }
            }
        }
    };
}

impl_capabilities!(UserPermission);
impl_capabilities!(GroupPermission);

/// `INHERITS_FROM` edge, child Group -> parent Group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inheritance {
    /// Child group id.
    #[serde(rename = "from")]
    pub child_id: String,
    /// Parent group id.
    #[serde(rename = "to")]
    pub parent_id: String,
    /// Creation time.
    pub created_at: Timestamp,
}

/// The seven record kinds of the dataset, in load order (nodes first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    /// [`User`] nodes.
    Users,
    /// [`Resource`] nodes.
    Resources,
    /// [`Group`] nodes.
    Groups,
    /// [`Membership`] edges.
    MemberOf,
    /// [`UserPermission`] edges.
    UserPermissions,
    /// [`GroupPermission`] edges.
    GroupPermissions,
    /// [`Inheritance`] edges.
    InheritsFrom,
}

impl RecordKind {
    /// All kinds, nodes before edges.
    pub const ALL: [RecordKind; 7] = [
        RecordKind::Users,
        RecordKind::Resources,
        RecordKind::Groups,
        RecordKind::MemberOf,
        RecordKind::UserPermissions,
        RecordKind::GroupPermissions,
        RecordKind::InheritsFrom,
    ];

    /// File stem used by the exporter (`users`, `member_of`, ...).
    pub fn file_stem(self) -> &'static str {
        match self {
            RecordKind::Users => "users",
            RecordKind::Resources => "resources",
            RecordKind::Groups => "groups",
            RecordKind::MemberOf => "member_of",
            RecordKind::UserPermissions => "user_permissions",
            RecordKind::GroupPermissions => "group_permissions",
            RecordKind::InheritsFrom => "inherits_from",
        }
    }

    /// Store table the kind is loaded into.
    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Users => "User",
            RecordKind::Resources => "Resource",
            RecordKind::Groups => "UserGroup",
            RecordKind::MemberOf => "MEMBER_OF",
            RecordKind::UserPermissions => "HAS_PERMISSION_USER",
            RecordKind::GroupPermissions => "HAS_PERMISSION_GROUP",
            RecordKind::InheritsFrom => "INHERITS_FROM",
        }
    }

    /// True for node kinds.
    pub fn is_node(self) -> bool {
        matches!(
            self,
            RecordKind::Users | RecordKind::Resources | RecordKind::Groups
        )
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Flat record exportable as one row of its kind's file.
pub trait Record: Serialize {
    /// Kind this record belongs to.
    const KIND: RecordKind;
}

impl Record for User {
    const KIND: RecordKind = RecordKind::Users;
}
impl Record for Resource {
    const KIND: RecordKind = RecordKind::Resources;
}
impl Record for Group {
    const KIND: RecordKind = RecordKind::Groups;
}
impl Record for Membership {
    const KIND: RecordKind = RecordKind::MemberOf;
}
impl Record for UserPermission {
    const KIND: RecordKind = RecordKind::UserPermissions;
}
impl Record for GroupPermission {
    const KIND: RecordKind = RecordKind::GroupPermissions;
}
impl Record for Inheritance {
    const KIND: RecordKind = RecordKind::InheritsFrom;
}
