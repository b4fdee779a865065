//! Namespace value type.
//!
//! A namespace identifies a collection within a database and supplies the
//! database name injected into every command.

use std::fmt;

/// Collection name used when a namespace addresses the database's command
/// pseudo-collection rather than a real collection.
const COMMAND_COLLECTION: &str = "$cmd";

/// An immutable (database, collection) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    /// Create a namespace for the given database and collection.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Create the command namespace for a database (`<db>.$cmd`).
    pub fn command(database: impl Into<String>) -> Self {
        Self::new(database, COMMAND_COLLECTION)
    }

    /// Get the database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Get the collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Get the full namespace string (`<db>.<collection>`).
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let ns = Namespace::new("app", "users");
        assert_eq!(ns.database(), "app");
        assert_eq!(ns.collection(), "users");
        assert_eq!(ns.full_name(), "app.users");
    }

    #[test]
    fn test_command_namespace() {
        let ns = Namespace::command("admin");
        assert_eq!(ns.full_name(), "admin.$cmd");
    }

    #[test]
    fn test_display_matches_full_name() {
        let ns = Namespace::new("app", "events");
        assert_eq!(ns.to_string(), ns.full_name());
    }
}
