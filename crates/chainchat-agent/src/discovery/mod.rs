//! Tool discovery: finds tool classes in installed packages, indexes them in
//! a persistent cache keyed by the package's distribution fingerprint, and
//! instantiates the ones a conversation asks for.
//!
//! - [`ecosystem`]: installed packages, their module trees and class registry
//! - [`scanner`]: lazy walk of a module tree yielding classes of a capability
//! - [`cache`]: SQLite-backed tool index, one generation per fingerprint
//! - [`loader`]: name → bound tool instance resolution

pub mod cache;
pub mod ecosystem;
pub mod loader;
pub mod scanner;

use std::fmt;

use thiserror::Error;

pub use cache::{ToolDescriptor, ToolIndexCache};
pub use ecosystem::{Capability, ClassSpec, Ecosystem, Module, Package};
pub use loader::ToolLoader;
pub use scanner::{find_classes, find_classes_dynamic, FoundClass};

/// Package scanned with the dynamic (import-running) scanner.
pub const COMMUNITY_PACKAGE: &str = "chainchat_community";

/// Package made of plugin-registered tool classes.
pub const PLUGIN_PACKAGE: &str = "chainchat_plugins";

/// Errors raised while discovering or instantiating tools.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool {name} not found. Use `list-tools`.")]
    NotFound { name: String },

    #[error("failed to import module {module}: {reason}")]
    Import { module: String, reason: String },

    #[error("module {module} has no class {class}")]
    ClassNotFound { module: String, class: String },

    #[error("class {class} cannot be instantiated without arguments")]
    NotInstantiable { class: String },

    #[error("tool cache error: {0}")]
    Cache(#[from] rusqlite::Error),
}

/// An installed distribution backing a package.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Distribution {
    pub name: String,
    pub version: String,
}

impl Distribution {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// Order-independent fingerprint of a distribution set: sorted `name==version`
/// entries joined with `,`.
pub fn format_distributions_key(distributions: &[Distribution]) -> String {
    let mut entries: Vec<String> = distributions.iter().map(|d| d.to_string()).collect();
    entries.sort();
    entries.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distributions_key_order_independent() {
        let a = [
            Distribution::new("tools-extra", "0.3.1"),
            Distribution::new("chainchat-community", "0.1.0"),
        ];
        let b = [a[1].clone(), a[0].clone()];
        let key = format_distributions_key(&a);
        assert_eq!(key, "chainchat-community==0.1.0,tools-extra==0.3.1");
        assert_eq!(key, format_distributions_key(&b));
    }

    #[test]
    fn test_not_found_message() {
        let err = ToolError::NotFound {
            name: "missing".into(),
        };
        assert_eq!(err.to_string(), "Tool missing not found. Use `list-tools`.");
    }
}
