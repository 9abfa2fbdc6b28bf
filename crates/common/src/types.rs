use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a distributed transaction.
    ///
    /// Opaque to the coordinator: callers supply it and it must be unique for
    /// the coordinator's lifetime. Orders reuse their transaction ID.
    TransactionId
);

string_id!(
    /// Inventory item identifier (e.g. `"pizza"`).
    ItemId
);

string_id!(
    /// Delivery agent identifier.
    AgentId
);

impl TransactionId {
    /// Generates a fresh transaction ID of the form
    /// `<yyyymmddHHMMSS>-<8 hex chars>`.
    pub fn generate() -> Self {
        let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{timestamp}-{}", &suffix[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_generate_creates_unique_ids() {
        let id1 = TransactionId::generate();
        let id2 = TransactionId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn transaction_id_generate_format() {
        let id = TransactionId::generate();
        let (timestamp, suffix) = id.as_str().split_once('-').unwrap();
        assert_eq!(timestamp.len(), 14);
        assert!(timestamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn item_id_display_and_borrow() {
        let id = ItemId::from("pizza");
        assert_eq!(id.to_string(), "pizza");

        let mut stock = std::collections::HashMap::new();
        stock.insert(id, 5u32);
        assert_eq!(stock.get("pizza"), Some(&5));
    }

    #[test]
    fn agent_id_serializes_transparently() {
        let id = AgentId::new("agent1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"agent1\"");
        let deserialized: AgentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
