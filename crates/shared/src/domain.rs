use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(CommentId);
id_newtype!(ClassId);
id_newtype!(ProfileId);

/// Optimistic-concurrency counter assigned by the store. It must be sent back
/// unchanged on update and delete; the store bumps it on every accepted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub i64);

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub class_id: ClassId,
    pub content: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "_version")]
    pub version: Version,
    #[serde(rename = "_deleted", default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.deleted.unwrap_or(false)
    }
}

/// Parses an `AWSDateTime`-style timestamp. Besides RFC 3339, accepts a
/// zone-less date-time and a bare date, both read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp `{raw}`")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub point: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveCommentKind {
    Edit,
    Reply,
}

/// Which comment, if any, the thread form is currently bound to. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveComment {
    pub id: CommentId,
    pub kind: ActiveCommentKind,
}

impl ActiveComment {
    pub fn edit(id: CommentId) -> Self {
        Self {
            id,
            kind: ActiveCommentKind::Edit,
        }
    }

    pub fn reply(id: CommentId) -> Self {
        Self {
            id,
            kind: ActiveCommentKind::Reply,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.kind == ActiveCommentKind::Edit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment_with_created(created_at: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "a",
            "classId": "class-1",
            "content": "hi",
            "createdAt": created_at,
            "updatedAt": "2024-01-01T10:30:00.000Z",
            "_version": 1
        })
    }

    #[test]
    fn comment_accepts_date_only_timestamps() {
        let comment: Comment =
            serde_json::from_value(comment_with_created("2024-01-01")).expect("decode");
        assert_eq!(comment.created_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(comment.updated_at.to_rfc3339(), "2024-01-01T10:30:00+00:00");
        assert!(!comment.is_deleted());
    }

    #[test]
    fn timestamps_without_zone_are_utc() {
        let parsed = parse_timestamp("2024-02-03T04:05:06.789").expect("parse");
        assert_eq!(parsed.to_rfc3339(), "2024-02-03T04:05:06.789+00:00");
        let offset = parse_timestamp("2024-02-03T04:05:06+02:00").expect("parse");
        assert_eq!(offset.to_rfc3339(), "2024-02-03T02:05:06+00:00");
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_timestamp("yesterday").is_none());
        let err = serde_json::from_value::<Comment>(comment_with_created("yesterday"))
            .expect_err("must fail");
        assert!(err.to_string().contains("yesterday"));
    }
}
