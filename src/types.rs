use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FeedError;

/// Identifier as it appears on the wire: the backend emits both numeric and
/// string ids depending on the entity.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl RawId {
    fn into_string(self) -> Result<String, FeedError> {
        let id = match self {
            RawId::Text(s) => s,
            RawId::Signed(n) => n.to_string(),
            RawId::Unsigned(n) => n.to_string(),
        };
        if id.trim().is_empty() {
            return Err(FeedError::Other("empty identifier".to_string()));
        }
        Ok(id)
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "RawId", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wrap a value without validation. Callers own uniqueness.
            pub fn new_unchecked(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<RawId> for $name {
            type Error = FeedError;

            fn try_from(raw: RawId) -> Result<Self, Self::Error> {
                raw.into_string().map(Self)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Stable issue identifier, unique within one collection fetch.
    IssueId
);
opaque_id!(UserId);
opaque_id!(CommentId);
opaque_id!(PlaceId);

/// Lifecycle state of a reported issue. Closed set: anything else on the
/// wire is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    Open,
    InProgress,
    Closed,
}

impl IssueStatus {
    /// The three buckets in display order.
    pub const ALL: [IssueStatus; 3] = [
        IssueStatus::Open,
        IssueStatus::InProgress,
        IssueStatus::Closed,
    ];

    /// Heading form used by the sidebar ("IN PROGRESS").
    pub fn label(self) -> &'static str {
        match self {
            IssueStatus::Open => "OPEN",
            IssueStatus::InProgress => "IN PROGRESS",
            IssueStatus::Closed => "CLOSED",
        }
    }

    /// Statuses that still need attention and appear in the main feed.
    pub fn is_active(self) -> bool {
        match self {
            IssueStatus::Open | IssueStatus::InProgress => true,
            IssueStatus::Closed => false,
        }
    }
}

enum_display_fromstr!(
    IssueStatus,
    crate::error::FeedError::InvalidStatus,
    {
        Open => "OPEN",
        InProgress => "IN_PROGRESS",
        Closed => "CLOSED",
    }
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    Other,
}

enum_display_fromstr!(
    MediaKind,
    crate::error::FeedError::InvalidMediaKind,
    {
        Image => "image",
        Video => "video",
        Other => "other",
    }
);

impl<'de> Deserialize<'de> for MediaKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw {
            None => MediaKind::Image,
            Some(s) => s.parse().unwrap_or(MediaKind::Other),
        })
    }
}

/// Attachment reference. Rendering only; never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: MediaKind,
}

/// Author summary embedded in issues and comments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default, alias = "fullName", deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(
        rename = "profilePhotoUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserSummary {
    /// Profile photo if set, else the generic avatar.
    pub fn avatar_url(&self) -> Option<&str> {
        self.profile_photo_url
            .as_deref()
            .or(self.avatar.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Uppercased first letter of the display name, shown when there is no
    /// avatar.
    pub fn initial(&self) -> Option<char> {
        self.name.chars().next().and_then(|c| c.to_uppercase().next())
    }
}

/// Named geographic reference (locality, zone, city).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlaceId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// The signed-in user as reported by the session service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(rename = "fullName", alias = "name", default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "profilePhotoUrl", default)]
    pub profile_photo_url: Option<String>,
    #[serde(default)]
    pub locality: Option<PlaceRef>,
    #[serde(default)]
    pub zone: Option<PlaceRef>,
    #[serde(default)]
    pub city: Option<PlaceRef>,
}

impl User {
    /// "Locality, City" as shown on the profile card.
    pub fn location_line(&self) -> String {
        let locality = self.locality.as_ref().map(|p| p.name.as_str());
        let city = self.city.as_ref().map(|p| p.name.as_str());
        match (locality, city) {
            (Some(l), Some(c)) => format!("{l}, {c}"),
            (Some(one), None) | (None, Some(one)) => one.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// A reported issue as delivered by one collection fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: IssueStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub department: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub locality: String,
    #[serde(rename = "createdAt", default, with = "wire_time")]
    pub created_at: Option<Timestamp>,
    #[serde(rename = "upvotes", default, deserialize_with = "null_as_default")]
    pub upvote_count: u64,
    #[serde(rename = "comments", default, deserialize_with = "null_as_default")]
    pub comment_count: u64,
    #[serde(rename = "postedBy", default, skip_serializing_if = "Option::is_none")]
    pub posted_by: Option<UserSummary>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub media: Vec<MediaRef>,
}

impl Issue {
    /// Whether this issue was reported by the given user.
    pub fn is_posted_by(&self, user: &UserId) -> bool {
        self.posted_by
            .as_ref()
            .and_then(|p| p.id.as_ref())
            .is_some_and(|id| id == user)
    }

    /// Anchor into the explore page for this issue.
    pub fn explore_link(&self) -> String {
        format!("/explore#{}", self.id)
    }
}

/// A comment on an issue. Comment lists are fetched whole, never paged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(rename = "issueId", default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<IssueId>,
    #[serde(default, alias = "postedBy", alias = "user")]
    pub author: Option<UserSummary>,
    #[serde(default, alias = "content", alias = "text")]
    pub body: String,
    #[serde(rename = "createdAt", default, with = "wire_time")]
    pub created_at: Option<Timestamp>,
}

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps arrive either as RFC 3339 instants or as zone-less local
/// date-times; the latter are read as UTC. Integers are epoch milliseconds.
/// Anything else unreadable becomes `None` instead of failing the row.
mod wire_time {
    use jiff::Timestamp;
    use jiff::civil::DateTime;
    use jiff::tz::TimeZone;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &Option<Timestamp>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => s.serialize_str(&ts.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
        let raw = Value::deserialize(d)?;
        Ok(match raw {
            Value::String(s) => parse(&s),
            Value::Number(n) => n
                .as_i64()
                .and_then(|ms| Timestamp::from_millisecond(ms).ok()),
            _ => None,
        })
    }

    pub(crate) fn parse(raw: &str) -> Option<Timestamp> {
        if let Ok(ts) = raw.parse::<Timestamp>() {
            return Some(ts);
        }
        let civil = raw.parse::<DateTime>().ok()?;
        civil.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp())
    }
}

#[cfg(test)]
pub(crate) fn parse_wire_time(raw: &str) -> Option<Timestamp> {
    wire_time::parse(raw)
}
