//! Identifier newtypes

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Accepts a JSON string or integer and yields its textual form.
struct TextId;

impl<'de> Visitor<'de> for TextId {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }
}

macro_rules! text_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(TextId).map(Self)
            }
        }
    };
}

text_id!(
    /// User identifier
    UserId
);
text_id!(
    /// Post identifier
    PostId
);
text_id!(
    /// Post category identifier
    CategoryId
);

/// Comment identity: a local placeholder until the server assigns one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommentId {
    /// Optimistically inserted, not yet confirmed
    Pending(String),
    /// Assigned by the server
    Server(String),
}

impl CommentId {
    /// Fresh placeholder identity (`temp-<uuid>`)
    pub fn pending() -> Self {
        CommentId::Pending(format!("temp-{}", uuid::Uuid::new_v4()))
    }

    pub fn server(id: impl Into<String>) -> Self {
        CommentId::Server(id.into())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CommentId::Pending(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            CommentId::Pending(id) | CommentId::Server(id) => id,
        }
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CommentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CommentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TextId).map(CommentId::Server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_accepts_string_and_integer() {
        let a: PostId = serde_json::from_str("\"42\"").unwrap();
        let b: PostId = serde_json::from_str("42").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&b).unwrap(), "\"42\"");
    }

    #[test]
    fn test_comment_ids() {
        let pending = CommentId::pending();
        assert!(pending.is_pending());
        assert!(pending.as_str().starts_with("temp-"));

        let server: CommentId = serde_json::from_str("7").unwrap();
        assert_eq!(server, CommentId::server("7"));
        assert!(!server.is_pending());
    }
}
