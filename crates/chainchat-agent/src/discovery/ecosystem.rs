//! Installed package ecosystem.
//!
//! A package is a tree of modules. Each module declares the classes it
//! defines and may carry an import hook: a fallible function that runs when
//! the module is imported and returns the classes it registers as a side
//! effect. Classes are compile-time [`ClassSpec`] entries, so resolving a
//! `(module, class)` pair from the cache ends at a plain factory function.

use std::fmt;
use std::sync::Arc;

use super::{Distribution, ToolError};
use crate::tools::Tool;

/// Capabilities a class can implement; the scanner filters on these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Tool,
    Toolkit,
}

/// Builds a fresh tool instance with no arguments.
pub type ToolFactory = fn() -> Arc<dyn Tool>;

/// Runs a module's import side effects.
pub type ImportHook = fn() -> anyhow::Result<Vec<ClassSpec>>;

/// A class definition known to the ecosystem.
#[derive(Clone, Copy)]
pub struct ClassSpec {
    pub name: &'static str,
    pub bases: &'static [Capability],
    /// Default value of the tool's `name` attribute; `None` for abstract classes.
    pub tool_name: Option<&'static str>,
    pub description: Option<&'static str>,
    pub factory: Option<ToolFactory>,
}

impl ClassSpec {
    /// A concrete tool class.
    pub const fn tool(
        name: &'static str,
        tool_name: &'static str,
        description: &'static str,
        factory: ToolFactory,
    ) -> Self {
        Self {
            name,
            bases: &[Capability::Tool],
            tool_name: Some(tool_name),
            description: Some(description),
            factory: Some(factory),
        }
    }

    pub fn is_subtype_of(&self, base: Capability) -> bool {
        self.bases.contains(&base)
    }
}

impl fmt::Debug for ClassSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassSpec")
            .field("name", &self.name)
            .field("bases", &self.bases)
            .field("tool_name", &self.tool_name)
            .finish()
    }
}

/// One module in a package tree. `path` is the full dotted path.
#[derive(Clone, Debug)]
pub struct Module {
    pub path: String,
    pub classes: Vec<ClassSpec>,
    pub import: Option<ImportHook>,
    pub submodules: Vec<Module>,
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            classes: Vec::new(),
            import: None,
            submodules: Vec::new(),
        }
    }

    pub fn with_classes(mut self, classes: &[ClassSpec]) -> Self {
        self.classes.extend_from_slice(classes);
        self
    }

    pub fn with_import(mut self, hook: ImportHook) -> Self {
        self.import = Some(hook);
        self
    }

    pub fn with_submodule(mut self, module: Module) -> Self {
        self.submodules.push(module);
        self
    }

    /// Find this module or a descendant by dotted path.
    pub fn find(&self, path: &str) -> Option<&Module> {
        if self.path == path {
            return Some(self);
        }
        let prefix = format!("{}.", self.path);
        if !path.starts_with(&prefix) {
            return None;
        }
        self.submodules.iter().find_map(|m| m.find(path))
    }

    /// Declared classes plus whatever the import hook registers.
    pub fn import(&self) -> Result<Vec<ClassSpec>, ToolError> {
        let mut classes = self.classes.clone();
        if let Some(hook) = self.import {
            let registered = hook().map_err(|e| ToolError::Import {
                module: self.path.clone(),
                reason: format!("{e:#}"),
            })?;
            classes.extend(registered);
        }
        Ok(classes)
    }
}

/// An importable top-level package and the distributions that install it.
#[derive(Clone, Debug)]
pub struct Package {
    pub name: String,
    pub distributions: Vec<Distribution>,
    pub root: Module,
}

impl Package {
    pub fn new(name: impl Into<String>, distributions: Vec<Distribution>) -> Self {
        let name = name.into();
        Self {
            root: Module::new(name.clone()),
            name,
            distributions,
        }
    }

    pub fn with_root(mut self, root: Module) -> Self {
        self.root = root;
        self
    }
}

/// The set of installed packages.
#[derive(Clone, Debug, Default)]
pub struct Ecosystem {
    packages: Vec<Package>,
}

impl Ecosystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a package, replacing any package with the same name.
    pub fn install(&mut self, package: Package) {
        match self.packages.iter_mut().find(|p| p.name == package.name) {
            Some(slot) => *slot = package,
            None => self.packages.push(package),
        }
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Distributions backing `package`, or `None` if it isn't installed.
    pub fn distributions(&self, package: &str) -> Option<&[Distribution]> {
        self.package(package).map(|p| p.distributions.as_slice())
    }

    pub fn find_module(&self, path: &str) -> Option<&Module> {
        let top = path.split('.').next().unwrap_or(path);
        self.package(top)?.root.find(path)
    }

    /// Import a module, returning every class it defines or registers.
    pub fn import_module(&self, path: &str) -> Result<Vec<ClassSpec>, ToolError> {
        let module = self.find_module(path).ok_or_else(|| ToolError::Import {
            module: path.to_string(),
            reason: format!("No module named '{path}'"),
        })?;
        module.import()
    }

    /// Look up a class by module path and class name.
    pub fn resolve_class(&self, module: &str, class: &str) -> Result<ClassSpec, ToolError> {
        self.import_module(module)?
            .into_iter()
            .find(|c| c.name == class)
            .ok_or_else(|| ToolError::ClassNotFound {
                module: module.to_string(),
                class: class.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolArgs;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Noop;

    #[async_trait]
    impl Tool for Noop {
        fn name(&self) -> &str {
            "noop"
        }
        fn description(&self) -> &str {
            "Does nothing"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: ToolArgs) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    fn new_noop() -> Arc<dyn Tool> {
        Arc::new(Noop)
    }

    const NOOP: ClassSpec = ClassSpec::tool("NoopTool", "noop", "Does nothing", new_noop);

    fn registers_noop() -> anyhow::Result<Vec<ClassSpec>> {
        Ok(vec![NOOP])
    }

    fn broken() -> anyhow::Result<Vec<ClassSpec>> {
        anyhow::bail!("missing optional dependency")
    }

    fn ecosystem() -> Ecosystem {
        let root = Module::new("pkg")
            .with_submodule(Module::new("pkg.a").with_classes(&[NOOP]))
            .with_submodule(
                Module::new("pkg.b")
                    .with_import(registers_noop)
                    .with_submodule(Module::new("pkg.b.inner")),
            )
            .with_submodule(Module::new("pkg.broken").with_import(broken));
        let mut eco = Ecosystem::new();
        eco.install(Package::new("pkg", vec![Distribution::new("pkg", "1.0")]).with_root(root));
        eco
    }

    #[test]
    fn test_find_module_nested() {
        let eco = ecosystem();
        assert_eq!(eco.find_module("pkg.b.inner").unwrap().path, "pkg.b.inner");
        assert!(eco.find_module("pkg.bx").is_none());
        assert!(eco.find_module("other.a").is_none());
    }

    #[test]
    fn test_import_runs_hook() {
        let eco = ecosystem();
        let classes = eco.import_module("pkg.b").unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].tool_name, Some("noop"));
    }

    #[test]
    fn test_import_failure() {
        let eco = ecosystem();
        let err = eco.import_module("pkg.broken").unwrap_err();
        assert!(matches!(err, ToolError::Import { ref module, .. } if module == "pkg.broken"));
        assert!(err.to_string().contains("missing optional dependency"));
    }

    #[test]
    fn test_resolve_class() {
        let eco = ecosystem();
        let spec = eco.resolve_class("pkg.a", "NoopTool").unwrap();
        let tool = (spec.factory.unwrap())();
        assert_eq!(tool.name(), "noop");

        let err = eco.resolve_class("pkg.a", "Missing").unwrap_err();
        assert!(matches!(err, ToolError::ClassNotFound { .. }));
    }

    #[test]
    fn test_install_replaces_package() {
        let mut eco = ecosystem();
        eco.install(Package::new("pkg", vec![Distribution::new("pkg", "2.0")]));
        assert_eq!(eco.distributions("pkg").unwrap()[0].version, "2.0");
        assert!(eco.find_module("pkg.a").is_none());
        assert!(eco.distributions("nope").is_none());
    }
}
