//! String newtypes for catalog identifiers.
//!
//! Both serialize as plain strings so the manifest stays hand-editable.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

id_newtype!(
    /// Catalog-unique identifier of an installable item.
    ItemId
);

id_newtype!(
    /// Identifier the host uses for an installed package (e.g. `com.example.app`).
    PackageId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn item_id_display_and_deref() {
        let id = ItemId::new("space-jump");
        assert_eq!(id.to_string(), "space-jump");
        assert_eq!(id.as_str(), "space-jump");
        assert!(id.starts_with("space"));
    }

    #[test]
    fn package_id_serializes_as_plain_string() {
        let pkg = PackageId::new("com.example.spacejump");
        let json = serde_json::to_string(&pkg).unwrap();
        assert_eq!(json, "\"com.example.spacejump\"");
        let back: PackageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pkg);
    }

    #[test]
    fn item_id_map_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(ItemId::from("a"), 1);
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), None);
    }
}
