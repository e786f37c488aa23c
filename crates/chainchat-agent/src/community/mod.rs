//! Built-in community tool package (`chainchat_community`).
//!
//! Every tool here has a zero-argument constructor so the loader can build it
//! from a cached `(module, class)` pair. Some modules only register their
//! classes when imported, which is why this package is scanned dynamically.

pub mod clock;
pub mod file_management;
pub mod requests;
pub mod shell;

use crate::discovery::{Distribution, Module, Package, COMMUNITY_PACKAGE};

/// Distribution that installs the community package.
pub const DISTRIBUTION: &str = "chainchat-community";

/// Dotted path of a submodule under `chainchat_community.tools`.
fn tools_module(name: &str) -> String {
    format!("{COMMUNITY_PACKAGE}.tools.{name}")
}

/// The community package as installed by this build.
pub fn package() -> Package {
    let tools = Module::new(format!("{COMMUNITY_PACKAGE}.tools"))
        .with_submodule(clock::module())
        .with_submodule(file_management::module())
        .with_submodule(requests::module())
        .with_submodule(shell::module());

    Package::new(
        COMMUNITY_PACKAGE,
        vec![Distribution::new(DISTRIBUTION, env!("CARGO_PKG_VERSION"))],
    )
    .with_root(Module::new(COMMUNITY_PACKAGE).with_submodule(tools))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{find_classes_dynamic, Capability, Ecosystem};

    #[test]
    fn test_community_tools_discoverable() {
        let mut eco = Ecosystem::new();
        eco.install(package());

        let root = format!("{COMMUNITY_PACKAGE}.tools");
        let names: Vec<&str> = find_classes_dynamic(&eco, &root, Capability::Tool)
            .filter_map(|f| f.class.tool_name)
            .collect();

        for expected in ["current_time", "read_file", "write_file", "list_directory", "requests_get"] {
            assert!(names.contains(&expected), "missing {expected}: {names:?}");
        }
        // The abstract file tool is a Tool subtype but has no name.
        let unnamed = find_classes_dynamic(&eco, &root, Capability::Tool)
            .filter(|f| f.class.tool_name.is_none())
            .count();
        assert_eq!(unnamed, 1);
    }

    #[test]
    fn test_fingerprint_tracks_crate_version() {
        let pkg = package();
        assert_eq!(pkg.distributions.len(), 1);
        assert_eq!(pkg.distributions[0].name, DISTRIBUTION);
        assert_eq!(pkg.distributions[0].version, env!("CARGO_PKG_VERSION"));
    }
}
