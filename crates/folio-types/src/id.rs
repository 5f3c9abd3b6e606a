use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, time-ordered identifier (UUID v7).
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Wrap an existing identifier string.
            ///
            /// Empty strings and strings with surrounding whitespace are rejected.
            pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
                let id = id.into();
                if id.is_empty() || id.trim() != id {
                    return Err(TypeError::InvalidId(id));
                }
                Ok(Self(id))
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Short form (first 8 characters) for log output.
            pub fn short_id(&self) -> &str {
                match self.0.char_indices().nth(8) {
                    Some((end, _)) => &self.0[..end],
                    None => &self.0,
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
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
    };
}

string_id! {
    /// Identifier of a persisted repository object.
    ///
    /// Assigned when an object is first persisted; a transient object has no
    /// id. Generated ids are UUID v7 strings, but any non-empty string is
    /// accepted so that a configured root folder id can be used verbatim.
    ObjectId
}

string_id! {
    /// Identifier grouping all versions of one logical document.
    VersionSeriesId
}
